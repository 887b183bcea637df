// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Category, Collection, Record};
use std::collections::HashMap;
use tracing::debug;

/// Notification channel a subscriber listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Records(Collection),
    Categories,
}

/// Event delivered to store subscribers. Stream errors travel on their own
/// variant, never mixed into the data events.
pub enum StoreEvent<'a> {
    Records(&'a [Record]),
    Categories(&'a [Category]),
    StreamError(&'a str),
}

pub type SubscriptionId = u64;
type Callback = Box<dyn FnMut(StoreEvent<'_>)>;

/// Last-known-canonical record sets per collection, as pushed by the remote
/// stream. The stream delivers full snapshots, not diffs, so `apply_*`
/// replaces the working set wholesale; conflict handling lives upstream in
/// the merged view and delete buffer. A monotonic generation counter lets
/// downstream caches detect staleness cheaply.
pub struct RecordStore {
    expenses: Vec<Record>,
    trades: Vec<Record>,
    categories: Vec<Category>,
    generation: u64,
    next_subscription: SubscriptionId,
    subscribers: HashMap<Channel, Vec<(SubscriptionId, Callback)>>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore {
            expenses: Vec::new(),
            trades: Vec::new(),
            categories: Vec::new(),
            generation: 0,
            next_subscription: 0,
            subscribers: HashMap::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn records(&self, collection: Collection) -> &[Record] {
        match collection {
            Collection::Expenses => &self.expenses,
            Collection::Trades => &self.trades,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Replace the working set for a collection with a full snapshot, bump
    /// the generation, and notify that collection's subscribers in order.
    pub fn apply_records(&mut self, collection: Collection, snapshot: Vec<Record>) {
        match collection {
            Collection::Expenses => self.expenses = snapshot,
            Collection::Trades => self.trades = snapshot,
        }
        self.generation += 1;
        debug!(
            collection = collection.as_str(),
            generation = self.generation,
            count = self.records(collection).len(),
            "snapshot applied"
        );
        self.notify(Channel::Records(collection));
    }

    pub fn apply_categories(&mut self, snapshot: Vec<Category>) {
        self.categories = snapshot;
        self.generation += 1;
        debug!(
            generation = self.generation,
            count = self.categories.len(),
            "category snapshot applied"
        );
        self.notify(Channel::Categories);
    }

    /// Deliver a stream error to a channel's subscribers. The last-known-good
    /// snapshot keeps serving; the generation does not move.
    pub fn report_stream_error(&mut self, channel: Channel, message: &str) {
        if let Some(subs) = self.subscribers.get_mut(&channel) {
            for (_, cb) in subs.iter_mut() {
                cb(StoreEvent::StreamError(message));
            }
        }
    }

    /// Register a subscriber. The callback fires once immediately with the
    /// current state, then on every subsequent apply.
    pub fn subscribe(&mut self, channel: Channel, mut callback: Callback) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        match channel {
            Channel::Records(c) => callback(StoreEvent::Records(self.records(c))),
            Channel::Categories => callback(StoreEvent::Categories(&self.categories)),
        }
        self.subscribers.entry(channel).or_default().push((id, callback));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for subs in self.subscribers.values_mut() {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    fn notify(&mut self, channel: Channel) {
        let RecordStore {
            expenses,
            trades,
            categories,
            subscribers,
            ..
        } = self;
        if let Some(subs) = subscribers.get_mut(&channel) {
            for (_, cb) in subs.iter_mut() {
                match channel {
                    Channel::Records(Collection::Expenses) => cb(StoreEvent::Records(expenses)),
                    Channel::Records(Collection::Trades) => cb(StoreEvent::Records(trades)),
                    Channel::Categories => cb(StoreEvent::Categories(categories)),
                }
            }
        }
    }
}
