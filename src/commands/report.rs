// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::analytics;
use crate::filter;
use crate::models::{Category, FilterCriteria, Record};
use crate::utils::{
    fmt_amount, load_json, maybe_print_json, parse_date, parse_decimal, pretty_table,
};
use anyhow::Result;
use serde_json::json;

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let json_flag = m.get_flag("json");
    let jsonl_flag = m.get_flag("jsonl");
    let records: Vec<Record> = load_json(m.get_one::<String>("records").unwrap())?;
    let categories: Vec<Category> = match m.get_one::<String>("categories") {
        Some(path) => load_json(path)?,
        None => Vec::new(),
    };
    let criteria = criteria_from_matches(m)?;
    let rows = filter::apply(&records, &categories, &criteria);

    let totals = analytics::totals(&rows);
    let breakdown = analytics::breakdown(&rows, &categories);
    let months = analytics::month_buckets(&rows);
    let weekdays = analytics::weekday_buckets(&rows);
    let trends: Vec<(String, analytics::Trend)> = breakdown
        .iter()
        .map(|slice| {
            (
                slice.name.clone(),
                analytics::trend_for_category(&rows, &categories, &slice.category_id),
            )
        })
        .collect();
    let sparkline = match m.get_one::<String>("sparkline") {
        Some(category_id) => {
            let days = match m.get_one::<String>("days") {
                Some(raw) => raw.parse::<usize>().unwrap_or(30),
                None => 30,
            };
            let today = match m.get_one::<String>("today") {
                Some(raw) => parse_date(raw)?,
                None => chrono::Utc::now().date_naive(),
            };
            Some(analytics::sparkline(
                &rows,
                &categories,
                Some(category_id.as_str()),
                days,
                today,
            ))
        }
        None => None,
    };

    let payload = json!({
        "totals": totals,
        "breakdown": breakdown,
        "months": months,
        "weekdays": weekdays,
        "trends": trends.iter().map(|(name, t)| json!({"name": name, "trend": t})).collect::<Vec<_>>(),
        "sparkline": sparkline,
    });
    if maybe_print_json(json_flag, jsonl_flag, &payload)? {
        return Ok(());
    }

    println!(
        "{}",
        pretty_table(
            &["Sum", "Count", "Average"],
            vec![vec![
                fmt_amount(&totals.sum),
                totals.count.to_string(),
                fmt_amount(&totals.average),
            ]],
        )
    );
    let data = breakdown
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                fmt_amount(&s.total),
                s.count.to_string(),
                format!("{}%", s.percent),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Total", "Count", "Share"], data)
    );
    let data = months
        .iter()
        .map(|b| vec![b.key.clone(), fmt_amount(&b.total), b.count.to_string()])
        .collect();
    println!("{}", pretty_table(&["Month", "Total", "Count"], data));
    let data = weekdays
        .iter()
        .map(|b| vec![b.key.clone(), fmt_amount(&b.total), b.count.to_string()])
        .collect();
    println!("{}", pretty_table(&["Day", "Total", "Count"], data));
    let data = trends
        .iter()
        .map(|(name, t)| {
            vec![
                name.clone(),
                t.direction.as_str().to_string(),
                format!("{}%", t.percent),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Category", "Trend", "Change"], data));
    if let Some(series) = sparkline {
        let line: Vec<String> = series.iter().map(fmt_amount).collect();
        println!("Sparkline: {}", line.join(" "));
    }
    Ok(())
}

fn criteria_from_matches(m: &clap::ArgMatches) -> Result<FilterCriteria> {
    let mut criteria = FilterCriteria::default();
    if let Some(raw) = m.get_one::<String>("start") {
        criteria.start = Some(parse_date(raw)?);
    }
    if let Some(raw) = m.get_one::<String>("end") {
        criteria.end = Some(parse_date(raw)?);
    }
    if let Some(ids) = m.get_many::<String>("category") {
        criteria.category_ids = ids.cloned().collect();
    }
    if let Some(q) = m.get_one::<String>("query") {
        criteria.query = q.clone();
    }
    if let Some(raw) = m.get_one::<String>("min") {
        criteria.min_amount = Some(parse_decimal(raw)?);
    }
    if let Some(raw) = m.get_one::<String>("max") {
        criteria.max_amount = Some(parse_decimal(raw)?);
    }
    Ok(criteria)
}
