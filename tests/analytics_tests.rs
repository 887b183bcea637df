// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use pocketsync::analytics::{
    AnalyticsEngine, TrendDirection, breakdown, month_buckets, sparkline, totals, trend_between,
    trend_of, week_buckets, weekday_buckets,
};
use pocketsync::models::{Category, PLACEHOLDER_CATEGORY, Record};
use rust_decimal::Decimal;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn record(id: &str, amount: &str, date_s: &str, category: Option<&str>) -> Record {
    Record {
        id: id.into(),
        amount: dec(amount),
        date: date(date_s),
        category_id: category.map(|c| c.to_string()),
        created_at: None,
        description: String::new(),
        notes: String::new(),
        location: String::new(),
        tags: Vec::new(),
        payment_method: String::new(),
    }
}

fn categories() -> Vec<Category> {
    vec![
        Category {
            id: "cat-food".into(),
            name: "Food".into(),
            color: String::new(),
            icon: String::new(),
        },
        Category {
            id: "cat-rent".into(),
            name: "Rent".into(),
            color: String::new(),
            icon: String::new(),
        },
    ]
}

#[test]
fn totals_on_empty_input_are_all_zero() {
    let t = totals(&[]);
    assert_eq!(t.sum, Decimal::ZERO);
    assert_eq!(t.count, 0);
    assert_eq!(t.average, Decimal::ZERO);
}

#[test]
fn totals_average() {
    let rows = vec![
        record("rec-1", "10", "2025-08-01", None),
        record("rec-2", "20", "2025-08-02", None),
    ];
    let t = totals(&rows);
    assert_eq!(t.sum, dec("30"));
    assert_eq!(t.count, 2);
    assert_eq!(t.average, dec("15"));
}

#[test]
fn breakdown_conserves_total_and_count() {
    let rows = vec![
        record("rec-1", "100", "2025-08-01", Some("cat-food")),
        record("rec-2", "50", "2025-08-02", Some("cat-food")),
        record("rec-3", "200", "2025-08-03", Some("cat-rent")),
        record("rec-4", "25", "2025-08-04", Some("ghost")),
        record("rec-5", "25", "2025-08-05", None),
    ];
    let slices = breakdown(&rows, &categories());

    let slice_sum: Decimal = slices.iter().map(|s| s.total).sum();
    assert_eq!(slice_sum, totals(&rows).sum);
    let slice_count: usize = slices.iter().map(|s| s.count).sum();
    assert_eq!(slice_count, rows.len());

    // descending by amount
    assert_eq!(slices[0].name, "Rent");
    assert_eq!(slices[1].name, "Food");

    // orphaned and uncategorized land on the placeholder, not dropped
    let placeholder = slices
        .iter()
        .find(|s| s.category_id == PLACEHOLDER_CATEGORY.id)
        .unwrap();
    assert_eq!(placeholder.total, dec("50"));
    assert_eq!(placeholder.count, 2);
}

#[test]
fn breakdown_percentages_are_zero_on_zero_grand_total() {
    let rows = vec![
        record("rec-1", "0", "2025-08-01", Some("cat-food")),
        record("rec-2", "0", "2025-08-02", Some("cat-rent")),
    ];
    for slice in breakdown(&rows, &categories()) {
        assert_eq!(slice.percent, Decimal::ZERO);
    }
}

#[test]
fn breakdown_percentages_sum_to_roughly_one_hundred() {
    let rows = vec![
        record("rec-1", "100", "2025-08-01", Some("cat-food")),
        record("rec-2", "200", "2025-08-02", Some("cat-rent")),
    ];
    let slices = breakdown(&rows, &categories());
    let percent_sum: Decimal = slices.iter().map(|s| s.percent).sum();
    assert!((percent_sum - dec("100")).abs() < dec("0.05"));
}

#[test]
fn month_buckets_are_chronological() {
    let rows = vec![
        record("rec-1", "10", "2025-08-01", None),
        record("rec-2", "20", "2025-06-15", None),
        record("rec-3", "30", "2025-07-20", None),
        record("rec-4", "40", "2025-07-25", None),
    ];
    let buckets = month_buckets(&rows);
    let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["2025-06", "2025-07", "2025-08"]);
    assert_eq!(buckets[1].total, dec("70"));
    assert_eq!(buckets[1].count, 2);
}

#[test]
fn week_buckets_use_iso_weeks() {
    let rows = vec![
        // Mon 2025-08-18 and Sun 2025-08-24 share ISO week 34
        record("rec-1", "10", "2025-08-18", None),
        record("rec-2", "20", "2025-08-24", None),
        record("rec-3", "30", "2025-08-25", None),
    ];
    let buckets = week_buckets(&rows);
    let keys: Vec<&str> = buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["2025-W34", "2025-W35"]);
    assert_eq!(buckets[0].total, dec("30"));
}

#[test]
fn weekday_buckets_cover_all_seven_days() {
    let rows = vec![
        record("rec-1", "10", "2025-08-18", None), // Monday
        record("rec-2", "20", "2025-08-24", None), // Sunday
    ];
    let buckets = weekday_buckets(&rows);
    assert_eq!(buckets.len(), 7);
    assert_eq!(buckets[0].key, "Mon");
    assert_eq!(buckets[0].total, dec("10"));
    assert_eq!(buckets[6].key, "Sun");
    assert_eq!(buckets[6].total, dec("20"));
    assert_eq!(buckets[2].total, Decimal::ZERO);
    assert_eq!(buckets[2].count, 0);
}

#[test]
fn trend_deadband_classification() {
    assert_eq!(
        trend_between(dec("100"), dec("109")).direction,
        TrendDirection::Stable
    );
    assert_eq!(
        trend_between(dec("100"), dec("111")).direction,
        TrendDirection::Up
    );
    assert_eq!(
        trend_between(dec("100"), dec("89")).direction,
        TrendDirection::Down
    );
    let t = trend_between(dec("0"), dec("50"));
    assert_eq!(t.direction, TrendDirection::New);
    assert_eq!(t.percent, dec("100"));
}

#[test]
fn trend_with_fewer_than_two_buckets_is_stable_zero() {
    let t = trend_of(&month_buckets(&[record("rec-1", "10", "2025-08-01", None)]));
    assert_eq!(t.direction, TrendDirection::Stable);
    assert_eq!(t.percent, Decimal::ZERO);

    let t = trend_of(&month_buckets(&[]));
    assert_eq!(t.direction, TrendDirection::Stable);
    assert_eq!(t.percent, Decimal::ZERO);
}

#[test]
fn trend_compares_the_two_most_recent_months() {
    let rows = vec![
        record("rec-1", "100", "2025-06-01", Some("cat-food")),
        record("rec-2", "100", "2025-07-01", Some("cat-food")),
        record("rec-3", "150", "2025-08-01", Some("cat-food")),
    ];
    let mut engine = AnalyticsEngine::new();
    let t = engine.category_trend(&rows, &categories(), "cat-food", 1);
    assert_eq!(t.direction, TrendDirection::Up);
    assert_eq!(t.percent, dec("50"));
}

#[test]
fn engine_caches_per_category_until_generation_moves() {
    let rows = vec![record("rec-1", "100", "2025-08-01", Some("cat-food"))];
    let mut engine = AnalyticsEngine::new();

    assert_eq!(engine.category_count(&rows, &categories(), "cat-food", 1), 1);
    // same generation: the cached value is served even though the slice
    // differs, which is exactly the contract
    assert_eq!(engine.category_count(&[], &categories(), "cat-food", 1), 1);
    // new generation invalidates wholesale
    assert_eq!(engine.category_count(&[], &categories(), "cat-food", 2), 0);
}

#[test]
fn sparkline_is_fixed_length_and_zero_filled() {
    let today = date("2025-08-30");
    let rows = vec![
        record("rec-1", "5", "2025-08-30", Some("cat-food")),
        record("rec-2", "3", "2025-08-29", Some("cat-food")),
        record("rec-3", "7", "2025-08-29", Some("cat-rent")),
        record("rec-4", "9", "2025-07-01", Some("cat-food")), // outside window
    ];
    let series = sparkline(&rows, &categories(), Some("cat-food"), 30, today);
    assert_eq!(series.len(), 30);
    assert_eq!(series[29], dec("5"));
    assert_eq!(series[28], dec("3"));
    assert!(series[..28].iter().all(|v| v.is_zero()));

    // no category: everything in-window sums per day
    let series = sparkline(&rows, &categories(), None, 30, today);
    assert_eq!(series[28], dec("10"));

    assert!(sparkline(&[], &categories(), None, 0, today).is_empty());
}
