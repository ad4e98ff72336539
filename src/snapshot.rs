//! One complete, render-ready view of a row set.
//!
//! Building a snapshot runs the whole pipeline from scratch: role keys are
//! inferred from the first row, every row is normalized and folded, colors
//! are assigned over the name-sorted categories, and the ranking views are
//! projected last so their own sort orders cannot disturb the colors.

use log::debug;
use serde::Serialize;

use crate::{
    aggregate::{Aggregates, CategoryAggregate, MonthlyAggregate, Totals, aggregate},
    rankings::{RankedRow, Rankings},
    roles::{RoleKeys, RoleOverrides, infer_role_keys_with},
    value::Row,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub role_keys: RoleKeys,
    pub aggregates: Aggregates,
    pub rankings: Rankings,
}

impl Snapshot {
    /// `None` when `rows` is empty.
    pub fn build(rows: &[Row]) -> Option<Self> {
        Self::build_with(rows, &RoleOverrides::default())
    }

    pub fn build_with(rows: &[Row], overrides: &RoleOverrides) -> Option<Self> {
        let role_keys = infer_role_keys_with(rows.first(), overrides);
        debug!("Resolved role keys: {role_keys:?}");
        Self::build_with_keys(rows, role_keys)
    }

    pub fn build_with_keys(rows: &[Row], role_keys: RoleKeys) -> Option<Self> {
        let aggregates = aggregate(rows, &role_keys)?;
        let rankings = Rankings::build(&aggregates, rows, &role_keys);
        Some(Self {
            role_keys,
            aggregates,
            rankings,
        })
    }

    pub fn totals(&self) -> &Totals {
        &self.aggregates.totals
    }

    pub fn monthly(&self) -> &[MonthlyAggregate] {
        &self.rankings.monthly
    }

    pub fn categories(&self) -> &[CategoryAggregate] {
        &self.aggregates.categories
    }

    pub fn top_expense_categories(&self) -> &[CategoryAggregate] {
        &self.rankings.top_expense_categories
    }

    pub fn top_profit_rows(&self) -> &[RankedRow] {
        &self.rankings.top_profit_rows
    }
}
