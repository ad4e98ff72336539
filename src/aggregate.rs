//! Month and category aggregation.
//!
//! [`aggregate()`] folds every row through the normalizer into two keyed
//! accumulators (calendar month, category name) plus dataset totals. It is a
//! pure function of its inputs: the dashboard recomputes from scratch on
//! every change and two calls over the same rows give identical output.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    normalize::{MonthBucket, NormalizedRow, normalize},
    palette::{Color, assign_colors},
    roles::RoleKeys,
    value::Row,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    pub month_label: String,
    pub sort_key: i32,
    pub revenue: f64,
    pub expenses: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAggregate {
    pub name: String,
    pub revenue: f64,
    pub expenses: f64,
    pub profit: f64,
    pub margin_percent: f64,
    pub color: Color,
}

impl CategoryAggregate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revenue: 0.0,
            expenses: 0.0,
            profit: 0.0,
            margin_percent: 0.0,
            color: Color::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub row_count: usize,
    pub revenue: f64,
    pub expenses: f64,
    pub profit: f64,
    pub margin_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    /// Ascending by `sort_key`; the unknown bucket, if any, comes first.
    pub monthly: Vec<MonthlyAggregate>,
    /// Ascending by name, colors assigned in that order.
    pub categories: Vec<CategoryAggregate>,
    pub totals: Totals,
}

/// `100 * profit / revenue`, or zero when there is no positive revenue.
pub fn margin_percent(revenue: f64, profit: f64) -> f64 {
    if revenue > 0.0 {
        100.0 * profit / revenue
    } else {
        0.0
    }
}

/// Aggregates `rows` under `keys`. Returns `None` for an empty row set,
/// which callers present as "no data" rather than as empty charts.
pub fn aggregate<'a, I>(rows: I, keys: &RoleKeys) -> Option<Aggregates>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut accumulator = Accumulator::default();
    for row in rows {
        accumulator.ingest(normalize(row, keys));
    }
    accumulator.finish()
}

#[derive(Debug, Default)]
struct Sums {
    revenue: f64,
    expenses: f64,
    profit: f64,
}

impl Sums {
    fn add(&mut self, row: &NormalizedRow) {
        self.revenue += row.revenue;
        self.expenses += row.expense;
        self.profit += row.profit;
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    row_count: usize,
    totals: Sums,
    months: BTreeMap<i32, (String, Sums)>,
    categories: BTreeMap<String, Sums>,
}

impl Accumulator {
    fn ingest(&mut self, row: NormalizedRow) {
        self.row_count += 1;
        self.totals.add(&row);
        let MonthBucket { label, sort_key } = row.month.clone();
        self.months
            .entry(sort_key)
            .or_insert_with(|| (label, Sums::default()))
            .1
            .add(&row);
        self.categories
            .entry(row.category.clone())
            .or_default()
            .add(&row);
    }

    fn finish(self) -> Option<Aggregates> {
        if self.row_count == 0 {
            return None;
        }

        // Keyed by sort key, so iteration is already chronological.
        let monthly = self
            .months
            .into_iter()
            .map(|(sort_key, (month_label, sums))| MonthlyAggregate {
                month_label,
                sort_key,
                revenue: sums.revenue,
                expenses: sums.expenses,
                profit: sums.profit,
            })
            .collect::<Vec<_>>();

        // BTreeMap iteration is already name-ascending.
        let mut categories = self
            .categories
            .into_iter()
            .map(|(name, sums)| CategoryAggregate {
                name,
                revenue: sums.revenue,
                expenses: sums.expenses,
                profit: sums.profit,
                margin_percent: margin_percent(sums.revenue, sums.profit),
                color: Color::default(),
            })
            .collect::<Vec<_>>();
        assign_colors(&mut categories);

        Some(Aggregates {
            monthly,
            categories,
            totals: Totals {
                row_count: self.row_count,
                revenue: self.totals.revenue,
                expenses: self.totals.expenses,
                profit: self.totals.profit,
                margin_percent: margin_percent(self.totals.revenue, self.totals.profit),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{normalize::UNASSIGNED_CATEGORY, roles::infer_role_keys};

    #[test]
    fn empty_input_yields_no_aggregate() {
        assert!(aggregate(&Vec::<Row>::new(), &RoleKeys::default()).is_none());
    }

    #[test]
    fn margin_is_zero_without_positive_revenue() {
        assert_eq!(margin_percent(0.0, -5.0), 0.0);
        assert_eq!(margin_percent(-10.0, 5.0), 0.0);
        assert_eq!(margin_percent(50.0, -10.0), -20.0);
    }

    #[test]
    fn months_sort_chronologically_not_by_label() {
        let rows = vec![
            Row::new().with("date", "2024-03-01").with("revenue", 1.0),
            Row::new().with("date", "2023-12-01").with("revenue", 2.0),
            Row::new().with("date", "bad").with("revenue", 3.0),
            Row::new().with("date", "2024-01-15").with("revenue", 4.0),
        ];
        let keys = infer_role_keys(&rows[0]);
        let aggregates = aggregate(&rows, &keys).unwrap();
        let labels = aggregates
            .monthly
            .iter()
            .map(|m| m.month_label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Unknown", "Dec 23", "Jan 24", "Mar 24"]);
    }

    #[test]
    fn same_month_a_century_apart_stays_separate() {
        let rows = vec![
            Row::new().with("date", "2024-01-10").with("revenue", 1.0),
            Row::new().with("date", "1924-01-10").with("revenue", 2.0),
        ];
        let keys = infer_role_keys(&rows[0]);
        let aggregates = aggregate(&rows, &keys).unwrap();
        let months = aggregates
            .monthly
            .iter()
            .map(|m| (m.month_label.as_str(), m.sort_key, m.revenue))
            .collect::<Vec<_>>();
        assert_eq!(months, vec![("Jan 24", 192_400, 2.0), ("Jan 24", 202_400, 1.0)]);
    }

    #[test]
    fn rows_without_category_column_are_unassigned() {
        let rows = vec![
            Row::new().with("dept", "Ops").with("sales", 10.0).with("cost", 4.0),
            Row::new().with("sales", 5.0).with("cost", 1.0),
        ];
        let keys = infer_role_keys(&rows[0]);
        let aggregates = aggregate(&rows, &keys).unwrap();
        let names = aggregates
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Ops", UNASSIGNED_CATEGORY]);
        let unassigned = &aggregates.categories[1];
        assert_eq!(unassigned.revenue, 5.0);
        assert_eq!(unassigned.expenses, 1.0);
        assert_eq!(aggregates.totals.revenue, 15.0);
        assert_eq!(aggregates.totals.row_count, 2);
    }
}
