// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Category, FilterCriteria, Record};
use tracing::debug;

/// True when the record satisfies every set criterion. Unset bounds are
/// unconstrained; an inverted date range simply matches nothing.
pub fn matches(record: &Record, categories: &[Category], criteria: &FilterCriteria) -> bool {
    if let Some(start) = criteria.start {
        if record.date < start {
            return false;
        }
    }
    if let Some(end) = criteria.end {
        if record.date > end {
            return false;
        }
    }
    if !criteria.category_ids.is_empty() {
        match &record.category_id {
            Some(id) if criteria.category_ids.contains(id) => {}
            _ => return false,
        }
    }
    if let Some(min) = criteria.min_amount {
        if record.amount < min {
            return false;
        }
    }
    if let Some(max) = criteria.max_amount {
        if record.amount > max {
            return false;
        }
    }
    if !criteria.query.trim().is_empty() && !matches_query(record, categories, &criteria.query) {
        return false;
    }
    true
}

/// Case-insensitive substring search; any one field matching suffices.
fn matches_query(record: &Record, categories: &[Category], query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    let category_name = record
        .category_id
        .as_ref()
        .and_then(|id| categories.iter().find(|c| &c.id == id))
        .map(|c| c.name.as_str())
        .unwrap_or("");
    let fields = [
        record.description.as_str(),
        record.notes.as_str(),
        record.location.as_str(),
        record.payment_method.as_str(),
        category_name,
    ];
    if fields.iter().any(|f| f.to_lowercase().contains(&needle)) {
        return true;
    }
    if record.tags.iter().any(|t| t.to_lowercase().contains(&needle)) {
        return true;
    }
    record.amount.to_string().contains(&needle)
}

/// Direct, non-cached filter pass.
pub fn apply(records: &[Record], categories: &[Category], criteria: &FilterCriteria) -> Vec<Record> {
    records
        .iter()
        .filter(|r| matches(r, categories, criteria))
        .cloned()
        .collect()
}

struct CacheSlot {
    store_generation: u64,
    buffer_generation: u64,
    criteria_key: String,
    rows: Vec<Record>,
}

/// Single-slot memoization of the filter pass. Only the most recent result
/// needs to survive: the UI always queries the current criteria. The slot is
/// valid for the exact `(store generation, buffer generation, criteria)`
/// triple that produced it; an empty result is a valid cached value.
pub struct FilterEngine {
    slot: Option<CacheSlot>,
    recomputations: u64,
    result_generation: u64,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterEngine {
    pub fn new() -> Self {
        FilterEngine {
            slot: None,
            recomputations: 0,
            result_generation: 0,
        }
    }

    /// Total number of cache misses, for tests asserting hit behavior.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Content identity of the most recent result. Bumped on every
    /// recomputation; downstream analytics caches key on it.
    pub fn result_generation(&self) -> u64 {
        self.result_generation
    }

    /// Filter the merged rows, memoized. Returns the rows together with the
    /// result generation they belong to.
    pub fn filter(
        &mut self,
        merged: &[Record],
        categories: &[Category],
        store_generation: u64,
        buffer_generation: u64,
        criteria: &FilterCriteria,
    ) -> (&[Record], u64) {
        let criteria_key = criteria.cache_key();
        let hit = self.slot.as_ref().is_some_and(|s| {
            s.store_generation == store_generation
                && s.buffer_generation == buffer_generation
                && s.criteria_key == criteria_key
        });
        if !hit {
            let rows = apply(merged, categories, criteria);
            self.recomputations += 1;
            self.result_generation += 1;
            debug!(
                result_generation = self.result_generation,
                rows = rows.len(),
                "filter recomputed"
            );
            self.slot = Some(CacheSlot {
                store_generation,
                buffer_generation,
                criteria_key,
                rows,
            });
        }
        let rows = self
            .slot
            .as_ref()
            .map(|s| s.rows.as_slice())
            .unwrap_or(&[]);
        (rows, self.result_generation)
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }
}
