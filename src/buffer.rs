// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{PendingDelete, Record, RecordId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Delete-with-undo grace buffer. A record enters on a delete request, stays
/// visible to the merged view while its deadline is in the future, and leaves
/// by expiry (finalized), undo, or remote-failure rollback.
///
/// Deadlines live inside the entries; `expire_due` both selects and removes
/// them, and every removal path re-checks membership, so a timer firing that
/// was queued before a cancellation is a no-op.
pub struct OptimisticDeleteBuffer {
    pending: HashMap<RecordId, PendingDelete>,
    grace: Duration,
    generation: u64,
}

impl OptimisticDeleteBuffer {
    pub fn new(grace: Duration) -> Self {
        OptimisticDeleteBuffer {
            pending: HashMap::new(),
            grace,
            generation: 0,
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Membership generation, bumped on every mutation so the merged view
    /// and filter cache can invalidate without inspecting entries.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn snapshot(&self, id: &str) -> Option<&Record> {
        self.pending.get(id).map(|p| &p.snapshot)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Record> {
        self.pending.values().map(|p| &p.snapshot)
    }

    /// Track a new pending delete. Captures the snapshot and arms the
    /// deadline at `now + grace`. Returns the deadline.
    pub fn begin(&mut self, record: &Record, now: DateTime<Utc>) -> DateTime<Utc> {
        let deadline = now + self.grace;
        self.pending.insert(
            record.id.clone(),
            PendingDelete {
                record_id: record.id.clone(),
                snapshot: record.clone(),
                deadline,
            },
        );
        self.generation += 1;
        debug!(id = %record.id, %deadline, "delete pending");
        deadline
    }

    /// Remove an entry before its deadline (undo or rollback). Returns the
    /// entry if it was still pending; `None` once finalized.
    pub fn cancel(&mut self, id: &str) -> Option<PendingDelete> {
        let entry = self.pending.remove(id);
        if entry.is_some() {
            self.generation += 1;
            debug!(id, "pending delete cancelled");
        }
        entry
    }

    /// Finalize every entry whose deadline has passed, removing and
    /// returning them. Entries cancelled after an expiry was queued are
    /// simply absent here.
    pub fn expire_due(&mut self, now: DateTime<Utc>) -> Vec<PendingDelete> {
        let due: Vec<RecordId> = self
            .pending
            .values()
            .filter(|p| p.deadline <= now)
            .map(|p| p.record_id.clone())
            .collect();
        let mut finalized = Vec::with_capacity(due.len());
        for id in due {
            if let Some(entry) = self.pending.remove(&id) {
                debug!(id = %entry.record_id, "delete finalized");
                finalized.push(entry);
            }
        }
        if !finalized.is_empty() {
            self.generation += 1;
        }
        finalized
    }

    /// Drop all entries without finalizing, for view teardown.
    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            self.pending.clear();
            self.generation += 1;
        }
    }
}
