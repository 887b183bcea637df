// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub type RecordId = String;
pub type CategoryId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Expenses,
    Trades,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Expenses => "expenses",
            Collection::Trades => "trades",
        }
    }
}

/// A single expense or trade as delivered by the remote stream. Trades carry
/// no category. `id` is assigned by the remote store on creation; a record
/// with an empty id cannot be addressed for update or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub amount: Decimal,
    pub date: NaiveDate,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub payment_method: String,
}

impl Record {
    /// Display order: newest date first, ties broken by `created_at`
    /// descending, then by id descending when either side lacks `created_at`.
    pub fn display_cmp(&self, other: &Record) -> Ordering {
        other
            .date
            .cmp(&self.date)
            .then_with(|| match (&self.created_at, &other.created_at) {
                (Some(a), Some(b)) => b.cmp(a),
                _ => Ordering::Equal,
            })
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
}

/// Stand-in category for records whose `category_id` no longer resolves (or
/// was never set, as with trades). Rendering and analytics fall back to this
/// instead of erroring.
pub static PLACEHOLDER_CATEGORY: Lazy<Category> = Lazy::new(|| Category {
    id: "(orphaned)".to_string(),
    name: "(uncategorized)".to_string(),
    color: "#9e9e9e".to_string(),
    icon: "help".to_string(),
});

/// Value object describing the current view filter. Field-wise equality;
/// `cache_key` yields a canonical string for cache indexing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    /// Empty set means "all categories".
    #[serde(default)]
    pub category_ids: BTreeSet<CategoryId>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    #[serde(default)]
    pub max_amount: Option<Decimal>,
}

impl FilterCriteria {
    /// Canonical cache key. JSON keeps heterogeneous fields unambiguous, so
    /// distinct criteria can never collide the way naive string
    /// concatenation would.
    pub fn cache_key(&self) -> String {
        // Plain data fields; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A delete the user has requested but can still undo. Exists only between
/// the delete request and expiry, undo, or remote failure.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDelete {
    pub record_id: RecordId,
    pub snapshot: Record,
    pub deadline: DateTime<Utc>,
}
