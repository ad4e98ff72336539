//! Dashboard configuration persisted as YAML.
//!
//! Every field is optional in the file; command-line flags override what
//! the file provides.

use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    buffer::DEFAULT_ROW_LIMIT, insights::InsightSettings, roles::RoleOverrides,
    source::DEFAULT_POLL_INTERVAL,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Active table name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Directory holding table files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,
    /// Rows kept in memory; older rows are evicted.
    pub row_limit: usize,
    pub poll_interval_ms: u64,
    #[serde(skip_serializing_if = "RoleOverrides::is_empty")]
    pub roles: RoleOverrides,
    pub insights: InsightSettings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            table: None,
            source_dir: None,
            row_limit: DEFAULT_ROW_LIMIT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            roles: RoleOverrides::default(),
            insights: InsightSettings::default(),
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let mut raw = String::new();
        file.read_to_string(&mut raw)
            .with_context(|| format!("Reading config file {path:?}"))?;
        let config: DashboardConfig = if raw.trim().is_empty() {
            DashboardConfig::default()
        } else {
            serde_yaml::from_str(&raw).with_context(|| format!("Parsing config file {path:?}"))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_yaml::to_string(self).context("Serializing config")?;
        let mut file =
            File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.row_limit > 0, "row_limit must be greater than zero");
        ensure!(
            self.insights.context_rows > 0,
            "insights.context_rows must be greater than zero"
        );
        if let Some(table) = &self.table {
            ensure!(!table.trim().is_empty(), "table must not be blank");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
