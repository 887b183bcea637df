// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::buffer::OptimisticDeleteBuffer;
use crate::models::Record;
use std::collections::HashSet;

/// Canonical records plus still-pending delete snapshots, de-duplicated by
/// id and sorted for display (newest first). Pure function of its inputs.
pub fn merge(canonical: &[Record], buffer: &OptimisticDeleteBuffer) -> Vec<Record> {
    let mut seen: HashSet<&str> = canonical.iter().map(|r| r.id.as_str()).collect();
    let mut rows: Vec<Record> = canonical.to_vec();
    for snapshot in buffer.snapshots() {
        // A record present in both sources must appear exactly once; the
        // canonical copy wins.
        if seen.insert(snapshot.id.as_str()) {
            rows.push(snapshot.clone());
        }
    }
    rows.sort_by(|a, b| a.display_cmp(b));
    rows
}

/// Memoized wrapper around `merge`, keyed by the store and buffer
/// generations. No state of its own beyond the cached pair.
pub struct MergedView {
    cached: Option<((u64, u64), Vec<Record>)>,
}

impl Default for MergedView {
    fn default() -> Self {
        Self::new()
    }
}

impl MergedView {
    pub fn new() -> Self {
        MergedView { cached: None }
    }

    pub fn current(
        &mut self,
        canonical: &[Record],
        store_generation: u64,
        buffer: &OptimisticDeleteBuffer,
    ) -> &[Record] {
        let key = (store_generation, buffer.generation());
        let hit = self.cached.as_ref().is_some_and(|(k, _)| *k == key);
        if !hit {
            self.cached = Some((key, merge(canonical, buffer)));
        }
        // Refreshed above when absent
        self.cached
            .as_ref()
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }
}
