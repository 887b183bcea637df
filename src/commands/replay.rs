// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::analytics;
use crate::models::{Category, Collection, FilterCriteria, Record};
use crate::remote::MemoryRemote;
use crate::session::{DeleteTicket, ManualClock, SyncConfig, SyncSession};
use crate::utils::{fmt_amount, load_json, maybe_print_json, parse_collection, pretty_table};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One step of a recorded session. Scripts interleave stream deliveries,
/// user actions, clock movement, and event pumps, which is exactly the
/// ordering surface the subsystem has to get right.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ReplayEvent {
    Clock { now: DateTime<Utc> },
    Advance { seconds: i64 },
    Snapshot { collection: Collection, records: Vec<Record> },
    Categories { categories: Vec<Category> },
    Filter { criteria: FilterCriteria },
    Delete { id: String },
    Undo { id: String },
    /// Script the next remote delete of this id to fail.
    FailDelete { id: String },
    /// Drain remote completions and fire due undo deadlines.
    Pump,
    /// Re-deliver canonical snapshots from the remote, like the stream.
    Sync,
}

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let json_flag = m.get_flag("json");
    let jsonl_flag = m.get_flag("jsonl");
    let collection = match m.get_one::<String>("collection") {
        Some(raw) => parse_collection(raw)?,
        None => Collection::Expenses,
    };
    let grace = match m.get_one::<String>("grace") {
        Some(raw) => Duration::seconds(
            raw.parse::<i64>()
                .with_context(|| format!("Invalid grace '{}'", raw))?,
        ),
        None => Duration::seconds(5),
    };
    let events: Vec<ReplayEvent> = load_json(m.get_one::<String>("script").unwrap())?;

    let remote = Rc::new(RefCell::new(MemoryRemote::new()));
    let clock = ManualClock::new(Utc::now());
    let config = SyncConfig {
        grace,
        ..SyncConfig::default()
    };
    let mut session = SyncSession::new(
        Box::new(remote.clone()),
        clock.clone(),
        collection,
        config,
    );
    let mut tickets: HashMap<String, DeleteTicket> = HashMap::new();

    for event in events {
        match event {
            ReplayEvent::Clock { now } => clock.set(now),
            ReplayEvent::Advance { seconds } => clock.advance(Duration::seconds(seconds)),
            ReplayEvent::Snapshot {
                collection: target,
                records,
            } => {
                remote.borrow_mut().seed(target, records.clone());
                session.apply_records(target, records);
            }
            ReplayEvent::Categories { categories } => session.apply_categories(categories),
            ReplayEvent::Filter { criteria } => session.set_filter(criteria),
            ReplayEvent::Delete { id } => {
                let record = session
                    .canonical()
                    .iter()
                    .find(|r| r.id == id)
                    .cloned()
                    .with_context(|| format!("delete: unknown record '{}'", id))?;
                match session.request_delete(&record) {
                    Ok(ticket) => {
                        tickets.insert(id, ticket);
                    }
                    Err(e) => println!("delete {} refused: {}", id, e),
                }
            }
            ReplayEvent::Undo { id } => match tickets.remove(&id) {
                Some(ticket) => {
                    if let Err(e) = session.undo(&ticket) {
                        println!("undo {}: {}", id, e);
                    }
                }
                None => println!("undo {}: no delete ticket", id),
            },
            ReplayEvent::FailDelete { id } => remote.borrow_mut().fail_next_delete(&id),
            ReplayEvent::Pump => session.pump(),
            ReplayEvent::Sync => {
                let snapshot = remote.borrow().records(collection);
                session.apply_records(collection, snapshot);
            }
        }
    }

    let summary = session.analytics_summary();
    let rows: Vec<Record> = session.filtered().to_vec();
    let errors: Vec<String> = session
        .take_errors()
        .iter()
        .map(|e| e.to_string())
        .collect();

    let payload = json!({
        "filtered": rows,
        "analytics": summary,
        "errors": errors,
    });
    if maybe_print_json(json_flag, jsonl_flag, &payload)? {
        return Ok(());
    }

    let data = rows
        .iter()
        .map(|r| {
            vec![
                r.date.to_string(),
                r.description.clone(),
                fmt_amount(&r.amount),
                analytics::resolve_category(r, session.categories())
                    .name
                    .clone(),
                if session.is_pending(&r.id) {
                    "pending".to_string()
                } else {
                    String::new()
                },
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Description", "Amount", "Category", ""], data)
    );
    println!(
        "{}",
        pretty_table(
            &["Sum", "Count", "Average"],
            vec![vec![
                fmt_amount(&summary.totals.sum),
                summary.totals.count.to_string(),
                fmt_amount(&summary.totals.average),
            ]],
        )
    );
    for e in errors {
        println!("error: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn replay_delete_then_expiry_finalizes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"event":"clock","now":"2025-08-01T00:00:00Z"}},
                {{"event":"snapshot","collection":"expenses","records":[
                    {{"id":"rec-1","amount":"12.50","date":"2025-08-01","description":"coffee"}}
                ]}},
                {{"event":"delete","id":"rec-1"}},
                {{"event":"advance","seconds":6}},
                {{"event":"pump"}},
                {{"event":"sync"}}
            ]"#
        )
        .unwrap();
        let matches = crate::cli::build_cli()
            .try_get_matches_from([
                "pocketsync",
                "replay",
                "--script",
                file.path().to_str().unwrap(),
                "--json",
            ])
            .unwrap();
        let sub = matches.subcommand_matches("replay").unwrap();
        handle(sub).unwrap();
    }
}
