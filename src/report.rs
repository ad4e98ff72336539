//! Terminal and JSON rendering of a dashboard snapshot.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    insights::InsightState,
    palette::Color,
    snapshot::Snapshot,
    table::TextTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Paint a truecolor swatch next to each category.
    pub swatches: bool,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    table: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<&'a Snapshot>,
    insights: &'a InsightState,
}

pub fn render_json(
    table: &str,
    snapshot: Option<&Snapshot>,
    insights: &InsightState,
) -> Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        table,
        snapshot,
        insights,
    })
    .context("Serializing report")
}

pub fn render_text(
    table: &str,
    snapshot: Option<&Snapshot>,
    insights: &InsightState,
    options: RenderOptions,
) -> String {
    let mut output = String::new();
    let Some(snapshot) = snapshot else {
        let _ = writeln!(output, "No data in '{table}'.");
        return output;
    };

    let totals = snapshot.totals();
    let _ = writeln!(
        output,
        "{table}: {} row(s) | revenue {} | expenses {} | profit {} | margin {}",
        totals.row_count,
        money(totals.revenue),
        money(totals.expenses),
        money(totals.profit),
        percent(totals.margin_percent),
    );
    let _ = writeln!(
        output,
        "columns: {}",
        snapshot
            .role_keys
            .iter()
            .map(|(role, key)| format!("{role}={key}"))
            .join(", ")
    );
    output.push('\n');

    let mut monthly = TextTable::new(["month", "revenue", "expenses", "profit"])
        .titled("Monthly")
        .right(&[1, 2, 3]);
    for month in snapshot.monthly() {
        monthly.push(vec![
            month.month_label.clone(),
            money(month.revenue),
            money(month.expenses),
            money(month.profit),
        ]);
    }
    output.push_str(&monthly.render());
    output.push('\n');

    let mut categories =
        TextTable::new(["category", "revenue", "expenses", "profit", "margin", "color"])
            .titled("Categories")
            .right(&[1, 2, 3, 4]);
    for category in snapshot.categories() {
        categories.push(vec![
            category.name.clone(),
            money(category.revenue),
            money(category.expenses),
            money(category.profit),
            percent(category.margin_percent),
            color_cell(category.color, options),
        ]);
    }
    output.push_str(&categories.render());
    output.push('\n');

    let mut expenses = TextTable::new(["category", "expenses", "color"])
        .titled("Top categories by expense")
        .right(&[1]);
    for category in snapshot.top_expense_categories() {
        expenses.push(vec![
            category.name.clone(),
            money(category.expenses),
            color_cell(category.color, options),
        ]);
    }
    output.push_str(&expenses.render());
    output.push('\n');

    let mut profitable = TextTable::new(["row", "revenue", "profit"])
        .titled("Top rows by profit")
        .right(&[1, 2]);
    for row in snapshot.top_profit_rows() {
        profitable.push(vec![row.label.clone(), money(row.revenue), money(row.profit)]);
    }
    output.push_str(&profitable.render());

    if let Some(data) = insights.data() {
        output.push('\n');
        let _ = writeln!(output, "Insights");
        let _ = writeln!(output, "{}", data.summary);
        for trend in &data.trends {
            let _ = writeln!(output, "  trend: {trend}");
        }
        for anomaly in &data.anomalies {
            let _ = writeln!(output, "  anomaly: {anomaly}");
        }
    } else if *insights == InsightState::Pending {
        output.push_str("\nInsights: generating...\n");
    }
    output
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn color_cell(color: Color, options: RenderOptions) -> String {
    if !options.swatches {
        return color.hex().to_string();
    }
    match rgb(color.hex()) {
        Some((r, g, b)) => format!("\u{1b}[38;2;{r};{g};{b}m██\u{1b}[0m {}", color.hex()),
        None => color.hex().to_string(),
    }
}

fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
