// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use pocketsync::models::{Category, Collection, Record};
use pocketsync::store::{Channel, RecordStore, StoreEvent};
use std::cell::RefCell;
use std::rc::Rc;

fn record(id: &str, amount: &str, date: &str) -> Record {
    Record {
        id: id.into(),
        amount: amount.parse().unwrap(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        category_id: None,
        created_at: None,
        description: String::new(),
        notes: String::new(),
        location: String::new(),
        tags: Vec::new(),
        payment_method: String::new(),
    }
}

#[test]
fn subscribe_fires_immediately_then_on_every_apply() {
    let mut store = RecordStore::new();
    let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let id = store.subscribe(
        Channel::Records(Collection::Expenses),
        Box::new(move |event| {
            if let StoreEvent::Records(rows) = event {
                sink.borrow_mut().push(rows.len());
            }
        }),
    );
    assert_eq!(*seen.borrow(), vec![0]);

    store.apply_records(
        Collection::Expenses,
        vec![record("rec-1", "5", "2025-08-01")],
    );
    assert_eq!(*seen.borrow(), vec![0, 1]);

    store.unsubscribe(id);
    store.apply_records(Collection::Expenses, vec![]);
    assert_eq!(*seen.borrow(), vec![0, 1]);
}

#[test]
fn generation_bumps_on_every_apply() {
    let mut store = RecordStore::new();
    assert_eq!(store.generation(), 0);
    store.apply_records(Collection::Expenses, vec![]);
    store.apply_records(Collection::Trades, vec![]);
    store.apply_categories(vec![]);
    assert_eq!(store.generation(), 3);
}

#[test]
fn collections_are_independent() {
    let mut store = RecordStore::new();
    store.apply_records(
        Collection::Expenses,
        vec![record("rec-1", "5", "2025-08-01")],
    );
    store.apply_records(Collection::Trades, vec![record("rec-2", "9", "2025-08-02")]);
    assert_eq!(store.records(Collection::Expenses).len(), 1);
    assert_eq!(store.records(Collection::Trades).len(), 1);
    assert_eq!(store.records(Collection::Expenses)[0].id, "rec-1");
}

#[test]
fn snapshots_replace_not_merge() {
    let mut store = RecordStore::new();
    store.apply_records(
        Collection::Expenses,
        vec![
            record("rec-1", "5", "2025-08-01"),
            record("rec-2", "7", "2025-08-02"),
        ],
    );
    store.apply_records(
        Collection::Expenses,
        vec![record("rec-3", "1", "2025-08-03")],
    );
    let ids: Vec<&str> = store
        .records(Collection::Expenses)
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["rec-3"]);
}

#[test]
fn stream_errors_travel_separately_and_keep_last_good_snapshot() {
    let mut store = RecordStore::new();
    store.apply_records(
        Collection::Expenses,
        vec![record("rec-1", "5", "2025-08-01")],
    );

    let errors: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let snapshots: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
    let err_sink = errors.clone();
    let snap_sink = snapshots.clone();
    store.subscribe(
        Channel::Records(Collection::Expenses),
        Box::new(move |event| match event {
            StoreEvent::Records(rows) => snap_sink.borrow_mut().push(rows.len()),
            StoreEvent::StreamError(msg) => err_sink.borrow_mut().push(msg.to_string()),
            StoreEvent::Categories(_) => {}
        }),
    );

    let generation = store.generation();
    store.report_stream_error(Channel::Records(Collection::Expenses), "connection reset");

    assert_eq!(*errors.borrow(), vec!["connection reset".to_string()]);
    // only the initial delivery; no data event was forged for the error
    assert_eq!(*snapshots.borrow(), vec![1]);
    assert_eq!(store.generation(), generation);
    assert_eq!(store.records(Collection::Expenses).len(), 1);
}

#[test]
fn category_channel_delivers_categories() {
    let mut store = RecordStore::new();
    let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    store.subscribe(
        Channel::Categories,
        Box::new(move |event| {
            if let StoreEvent::Categories(cats) = event {
                sink.borrow_mut()
                    .extend(cats.iter().map(|c| c.name.clone()));
            }
        }),
    );
    store.apply_categories(vec![Category {
        id: "cat-food".into(),
        name: "Food".into(),
        color: String::new(),
        icon: String::new(),
    }]);
    assert_eq!(*seen.borrow(), vec!["Food".to_string()]);
}
