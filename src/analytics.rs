// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Category, CategoryId, PLACEHOLDER_CATEGORY, Record};
use crate::utils::{month_key, week_key};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub sum: Decimal,
    pub count: usize,
    pub average: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySlice {
    pub category_id: CategoryId,
    pub name: String,
    pub total: Decimal,
    pub count: usize,
    /// Share of the grand total, rounded to two places; 0 when the grand
    /// total is 0.
    pub percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub key: String,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
    New,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Stable => "stable",
            TrendDirection::New => "new",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub percent: Decimal,
}

impl Trend {
    fn stable() -> Self {
        Trend {
            direction: TrendDirection::Stable,
            percent: Decimal::ZERO,
        }
    }
}

/// Everything an analytics observer needs to render a dashboard pane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub totals: Totals,
    pub breakdown: Vec<CategorySlice>,
    pub months: Vec<Bucket>,
}

/// Sum, count, average. Average is 0 on an empty set, never a division.
pub fn totals(records: &[Record]) -> Totals {
    let sum: Decimal = records.iter().map(|r| r.amount).sum();
    let count = records.len();
    let average = if count == 0 {
        Decimal::ZERO
    } else {
        sum / Decimal::from(count as u64)
    };
    Totals { sum, count, average }
}

/// Category a record aggregates under: its own when it resolves, the
/// placeholder for orphaned references and uncategorized records.
pub fn resolve_category<'a>(record: &Record, categories: &'a [Category]) -> &'a Category {
    record
        .category_id
        .as_ref()
        .and_then(|id| categories.iter().find(|c| &c.id == id))
        .unwrap_or(&PLACEHOLDER_CATEGORY)
}

/// Per-category sums with share of the grand total, sorted descending by
/// amount. Orphaned records land on the placeholder slice instead of being
/// dropped.
pub fn breakdown(records: &[Record], categories: &[Category]) -> Vec<CategorySlice> {
    let grand: Decimal = records.iter().map(|r| r.amount).sum();
    let mut grouped: HashMap<&str, (&Category, Decimal, usize)> = HashMap::new();
    for record in records {
        let category = resolve_category(record, categories);
        let entry = grouped
            .entry(category.id.as_str())
            .or_insert((category, Decimal::ZERO, 0));
        entry.1 += record.amount;
        entry.2 += 1;
    }
    let mut slices: Vec<CategorySlice> = grouped
        .into_values()
        .map(|(category, total, count)| CategorySlice {
            category_id: category.id.clone(),
            name: category.name.clone(),
            total,
            count,
            percent: if grand.is_zero() {
                Decimal::ZERO
            } else {
                (total / grand * Decimal::ONE_HUNDRED).round_dp(2)
            },
        })
        .collect();
    slices.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    slices
}

/// Day-of-week buckets, Monday first, all seven present even when empty.
pub fn weekday_buckets(records: &[Record]) -> Vec<Bucket> {
    const KEYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    let mut totals = [Decimal::ZERO; 7];
    let mut counts = [0usize; 7];
    for record in records {
        let idx = record.date.weekday().num_days_from_monday() as usize;
        totals[idx] += record.amount;
        counts[idx] += 1;
    }
    (0..7)
        .map(|idx| Bucket {
            key: KEYS[idx].to_string(),
            total: totals[idx],
            count: counts[idx],
        })
        .collect()
}

fn keyed_buckets(records: &[Record], key_of: impl Fn(NaiveDate) -> String) -> Vec<Bucket> {
    let mut grouped: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
    for record in records {
        let entry = grouped
            .entry(key_of(record.date))
            .or_insert((Decimal::ZERO, 0));
        entry.0 += record.amount;
        entry.1 += 1;
    }
    grouped
        .into_iter()
        .map(|(key, (total, count))| Bucket { key, total, count })
        .collect()
}

/// ISO-week buckets in chronological order.
pub fn week_buckets(records: &[Record]) -> Vec<Bucket> {
    keyed_buckets(records, week_key)
}

/// Calendar-month buckets in chronological order. Display may reorder; trend
/// computation always walks these chronologically.
pub fn month_buckets(records: &[Record]) -> Vec<Bucket> {
    keyed_buckets(records, month_key)
}

/// Period-over-period classification with a ±10% deadband so noise is not
/// flagged as a trend.
pub fn trend_between(prior: Decimal, current: Decimal) -> Trend {
    if prior.is_zero() {
        if current > Decimal::ZERO {
            return Trend {
                direction: TrendDirection::New,
                percent: Decimal::ONE_HUNDRED,
            };
        }
        return Trend::stable();
    }
    let percent = (current - prior) / prior * Decimal::ONE_HUNDRED;
    let direction = if percent > Decimal::TEN {
        TrendDirection::Up
    } else if percent < -Decimal::TEN {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    };
    Trend {
        direction,
        percent: percent.round_dp(2),
    }
}

/// Trend over the two most recent chronologically adjacent buckets. Fewer
/// than two data points is stable at 0%.
pub fn trend_of(buckets: &[Bucket]) -> Trend {
    match buckets {
        [.., prior, current] => trend_between(prior.total, current.total),
        _ => Trend::stable(),
    }
}

/// Month-over-month trend for one category slice (placeholder id selects the
/// orphaned/uncategorized records).
pub fn trend_for_category(
    records: &[Record],
    categories: &[Category],
    category_id: &str,
) -> Trend {
    let rows: Vec<Record> = records
        .iter()
        .filter(|r| resolve_category(r, categories).id == category_id)
        .cloned()
        .collect();
    trend_of(&month_buckets(&rows))
}

pub fn count_for_category(records: &[Record], categories: &[Category], category_id: &str) -> usize {
    records
        .iter()
        .filter(|r| resolve_category(r, categories).id == category_id)
        .count()
}

/// Fixed-length per-day totals ending at `today`, zero-filled, oldest first.
/// `category_id` of `None` sums every record.
pub fn sparkline(
    records: &[Record],
    categories: &[Category],
    category_id: Option<&str>,
    days: usize,
    today: NaiveDate,
) -> Vec<Decimal> {
    let mut series = vec![Decimal::ZERO; days];
    if days == 0 {
        return series;
    }
    let start = today - Duration::days(days as i64 - 1);
    for record in records {
        if let Some(wanted) = category_id {
            if resolve_category(record, categories).id != wanted {
                continue;
            }
        }
        let offset = (record.date - start).num_days();
        if (0..days as i64).contains(&offset) {
            series[offset as usize] += record.amount;
        }
    }
    series
}

pub fn summarize(records: &[Record], categories: &[Category]) -> AnalyticsSummary {
    AnalyticsSummary {
        totals: totals(records),
        breakdown: breakdown(records, categories),
        months: month_buckets(records),
    }
}

/// Memoized per-category derived values. The caches are valid only for the
/// exact filtered set that produced them, identified by the filter engine's
/// result generation — never by record count, which under-invalidates when
/// records are replaced 1:1.
pub struct AnalyticsEngine {
    cached_for: u64,
    trend_cache: HashMap<CategoryId, Trend>,
    count_cache: HashMap<CategoryId, usize>,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        AnalyticsEngine {
            cached_for: 0,
            trend_cache: HashMap::new(),
            count_cache: HashMap::new(),
        }
    }

    fn ensure_generation(&mut self, result_generation: u64) {
        if self.cached_for != result_generation {
            debug!(result_generation, "analytics caches invalidated");
            self.trend_cache.clear();
            self.count_cache.clear();
            self.cached_for = result_generation;
        }
    }

    pub fn category_trend(
        &mut self,
        records: &[Record],
        categories: &[Category],
        category_id: &str,
        result_generation: u64,
    ) -> Trend {
        self.ensure_generation(result_generation);
        if let Some(cached) = self.trend_cache.get(category_id) {
            return cached.clone();
        }
        let trend = trend_for_category(records, categories, category_id);
        self.trend_cache
            .insert(category_id.to_string(), trend.clone());
        trend
    }

    pub fn category_count(
        &mut self,
        records: &[Record],
        categories: &[Category],
        category_id: &str,
        result_generation: u64,
    ) -> usize {
        self.ensure_generation(result_generation);
        if let Some(cached) = self.count_cache.get(category_id) {
            return *cached;
        }
        let count = count_for_category(records, categories, category_id);
        self.count_cache.insert(category_id.to_string(), count);
        count
    }
}
