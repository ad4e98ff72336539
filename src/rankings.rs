//! Read-only projections over the aggregates.

use std::cmp::Ordering;

use serde::Serialize;

use crate::{
    aggregate::{Aggregates, CategoryAggregate, MonthlyAggregate},
    normalize::derived_profit,
    roles::RoleKeys,
    value::{Row, coerce_number, coerce_text},
};

pub const TOP_EXPENSE_CATEGORIES: usize = 5;
pub const TOP_PROFIT_ROWS: usize = 10;

/// One source row placed in the profit ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
    /// Value of the id column, or the row's position when that is blank.
    pub label: String,
    pub revenue: f64,
    pub profit: f64,
    /// Position of the row in the buffer it was ranked from.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rankings {
    pub monthly: Vec<MonthlyAggregate>,
    pub top_expense_categories: Vec<CategoryAggregate>,
    pub top_profit_rows: Vec<RankedRow>,
}

impl Rankings {
    pub fn build<'a, I>(aggregates: &Aggregates, rows: I, keys: &RoleKeys) -> Self
    where
        I: IntoIterator<Item = &'a Row>,
    {
        Self {
            monthly: monthly_series(aggregates),
            top_expense_categories: top_categories_by_expense(
                &aggregates.categories,
                TOP_EXPENSE_CATEGORIES,
            ),
            top_profit_rows: top_rows_by_profit(rows, keys, TOP_PROFIT_ROWS),
        }
    }
}

pub fn monthly_series(aggregates: &Aggregates) -> Vec<MonthlyAggregate> {
    aggregates.monthly.clone()
}

/// Highest-expense categories first. The sort is stable, so equal expenses
/// keep their name order, and colors are carried over untouched.
pub fn top_categories_by_expense(
    categories: &[CategoryAggregate],
    limit: usize,
) -> Vec<CategoryAggregate> {
    let mut ranked = categories.to_vec();
    ranked.sort_by(|a, b| descending(a.expenses, b.expenses));
    ranked.truncate(limit);
    ranked
}

/// Most profitable individual rows first, profit derived per row the same
/// way the aggregates derive it. Stable on ties.
pub fn top_rows_by_profit<'a, I>(rows: I, keys: &RoleKeys, limit: usize) -> Vec<RankedRow>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut ranked = rows
        .into_iter()
        .enumerate()
        .map(|(position, row)| {
            let label = coerce_text(row.get(&keys.id));
            RankedRow {
                label: if label.is_empty() {
                    format!("#{}", position + 1)
                } else {
                    label
                },
                revenue: coerce_number(row.get(&keys.revenue)),
                profit: derived_profit(row, keys),
                position,
            }
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| descending(a.profit, b.profit));
    ranked.truncate(limit);
    ranked
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
