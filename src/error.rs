//! Failure kinds surfaced by the dashboard.
//!
//! Only table- and fetch-level problems are errors. Malformed rows are
//! absorbed by the coercion rules in [`crate::value`], and insight failures
//! degrade to a placeholder rather than propagating.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("Table '{table}' was not found or cannot be accessed")]
    TableUnavailable { table: String },
    #[error("Fetching rows from '{table}' failed: {message}")]
    FetchFailure { table: String, message: String },
}

impl DashboardError {
    pub fn table(&self) -> &str {
        match self {
            DashboardError::TableUnavailable { table } => table,
            DashboardError::FetchFailure { table, .. } => table,
        }
    }

    /// What the user can do about it.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            DashboardError::TableUnavailable { .. } => "Choose a different table name.",
            DashboardError::FetchFailure { .. } => "Retry the refresh.",
        }
    }
}

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Insight service is not configured: {0}")]
    NotConfigured(String),
    #[error("Insight request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Insight service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Insight response could not be parsed: {0}")]
    Parse(String),
    #[error("Insight worker could not start: {0}")]
    Worker(String),
    #[error("Insight request was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Table name '{0}' is not valid")]
    InvalidTableName(String),
    #[error("Reading table '{table}' failed: {message}")]
    Backend { table: String, message: String },
}

impl SourceError {
    pub fn backend(table: &str, message: impl std::fmt::Display) -> Self {
        SourceError::Backend {
            table: table.to_string(),
            message: message.to_string(),
        }
    }
}
