//! Typed reading of one raw row under a set of role keys.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::{
    roles::RoleKeys,
    value::{Row, Value, coerce_date, coerce_number, coerce_text},
};

pub const UNKNOWN_MONTH: &str = "Unknown";
pub const UNASSIGNED_CATEGORY: &str = "Unassigned";

/// Calendar month a row falls into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub label: String,
    /// `year * 100 + zero-based month`, `0` for the unknown bucket.
    pub sort_key: i32,
}

impl MonthBucket {
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_MONTH.to_string(),
            sort_key: 0,
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            label: date.format("%b %y").to_string(),
            sort_key: date.year() * 100 + date.month0() as i32,
        }
    }

    pub fn for_value(value: Option<&Value>) -> Self {
        coerce_date(value).map_or_else(Self::unknown, Self::from_date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub revenue: f64,
    pub expense: f64,
    pub profit: f64,
    pub month: MonthBucket,
    pub category: String,
}

pub fn normalize(row: &Row, keys: &RoleKeys) -> NormalizedRow {
    let revenue = coerce_number(row.get(&keys.revenue));
    let expense = coerce_number(row.get(&keys.expense));
    NormalizedRow {
        revenue,
        expense,
        profit: profit_for(row, keys, revenue, expense),
        month: MonthBucket::for_value(row.get(&keys.date)),
        category: category_for(row, keys),
    }
}

/// Profit of a row: the profit cell when one is present (zero included),
/// otherwise revenue minus expense.
pub fn derived_profit(row: &Row, keys: &RoleKeys) -> f64 {
    let revenue = coerce_number(row.get(&keys.revenue));
    let expense = coerce_number(row.get(&keys.expense));
    profit_for(row, keys, revenue, expense)
}

fn profit_for(row: &Row, keys: &RoleKeys, revenue: f64, expense: f64) -> f64 {
    match row.get(&keys.profit) {
        Some(value) if !value.is_null() => coerce_number(Some(value)),
        _ => revenue - expense,
    }
}

fn category_for(row: &Row, keys: &RoleKeys) -> String {
    let text = coerce_text(row.get(&keys.category));
    if text.is_empty() {
        UNASSIGNED_CATEGORY.to_string()
    } else {
        text
    }
}
