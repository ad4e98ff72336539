//! Column role inference.
//!
//! Tables reach the dashboard with arbitrary, unlabeled columns. Each
//! semantic [`Role`] carries an ordered list of lowercase name fragments;
//! a role resolves to the first actual column whose lowercased name
//! contains the highest-priority fragment that matches anything at all.
//! Resolution never fails: an unmatched role keeps its default column name
//! and later lookups on it simply find nothing.
//!
//! Inference runs once per dataset against the first row only. Rows whose
//! shape differs from that sample are not detected; their cells under the
//! resolved names read as absent.

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::value::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Date,
    Category,
    Revenue,
    Expense,
    Profit,
    Id,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Date,
        Role::Category,
        Role::Revenue,
        Role::Expense,
        Role::Profit,
        Role::Id,
    ];

    /// Name fragments in priority order.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Role::Date => &["created_at", "date", "time"],
            Role::Category => &["department", "category", "dept", "group"],
            Role::Revenue => &["revenue", "sales", "amount", "total", "price"],
            Role::Expense => &["expense", "cost", "spending"],
            Role::Profit => &["profit", "net", "margin"],
            Role::Id => &["id", "order", "name"],
        }
    }

    /// Column name used when no candidate matches.
    pub fn default_key(self) -> &'static str {
        self.candidates()[0]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Date => "date",
            Role::Category => "category",
            Role::Revenue => "revenue",
            Role::Expense => "expense",
            Role::Profit => "profit",
            Role::Id => "id",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let lowered = value.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == lowered)
            .ok_or_else(|| anyhow!("Unknown column role '{value}'"))
    }
}

/// The column chosen for every role in one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleKeys {
    pub date: String,
    pub category: String,
    pub revenue: String,
    pub expense: String,
    pub profit: String,
    pub id: String,
}

impl Default for RoleKeys {
    fn default() -> Self {
        Self {
            date: Role::Date.default_key().to_string(),
            category: Role::Category.default_key().to_string(),
            revenue: Role::Revenue.default_key().to_string(),
            expense: Role::Expense.default_key().to_string(),
            profit: Role::Profit.default_key().to_string(),
            id: Role::Id.default_key().to_string(),
        }
    }
}

impl RoleKeys {
    pub fn key(&self, role: Role) -> &str {
        match role {
            Role::Date => &self.date,
            Role::Category => &self.category,
            Role::Revenue => &self.revenue,
            Role::Expense => &self.expense,
            Role::Profit => &self.profit,
            Role::Id => &self.id,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut String {
        match role {
            Role::Date => &mut self.date,
            Role::Category => &mut self.category,
            Role::Revenue => &mut self.revenue,
            Role::Expense => &mut self.expense,
            Role::Profit => &mut self.profit,
            Role::Id => &mut self.id,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &str)> {
        Role::ALL.into_iter().map(|role| (role, self.key(role)))
    }
}

/// Columns pinned by configuration, bypassing the heuristic per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl RoleOverrides {
    pub fn get(&self, role: Role) -> Option<&str> {
        let value = match role {
            Role::Date => &self.date,
            Role::Category => &self.category,
            Role::Revenue => &self.revenue,
            Role::Expense => &self.expense,
            Role::Profit => &self.profit,
            Role::Id => &self.id,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        Role::ALL.into_iter().all(|role| self.get(role).is_none())
    }
}

/// First column containing the highest-priority fragment of `role`.
pub fn resolve_role<'a, I>(columns: I, role: Role) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let lowered = columns
        .into_iter()
        .map(|column| (column, column.to_lowercase()))
        .collect::<Vec<_>>();
    role.candidates().iter().find_map(|candidate| {
        lowered
            .iter()
            .find(|(_, lower)| lower.contains(candidate))
            .map(|(original, _)| *original)
    })
}

pub fn infer_role_keys_from_columns<'a, I>(columns: I) -> RoleKeys
where
    I: IntoIterator<Item = &'a str>,
{
    let columns = columns.into_iter().collect::<Vec<_>>();
    let mut keys = RoleKeys::default();
    for role in Role::ALL {
        if let Some(column) = resolve_role(columns.iter().copied(), role) {
            *keys.slot_mut(role) = column.to_string();
        }
    }
    keys
}

pub fn infer_role_keys(sample: &Row) -> RoleKeys {
    infer_role_keys_from_columns(sample.columns())
}

/// Heuristic inference against `sample` (defaults when there is no sample)
/// with configured overrides applied on top.
pub fn infer_role_keys_with(sample: Option<&Row>, overrides: &RoleOverrides) -> RoleKeys {
    let mut keys = sample.map(infer_role_keys).unwrap_or_default();
    for role in Role::ALL {
        if let Some(column) = overrides.get(role) {
            *keys.slot_mut(role) = column.to_string();
        }
    }
    keys
}
