use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use log::info;

use crate::{
    cli::{OutputFormat, SourceArgs, SummaryArgs},
    config::DashboardConfig,
    dashboard::Dashboard,
    error::DashboardError,
    io_utils,
    report::{self, RenderOptions},
    roles::infer_role_keys_with,
    source::DirectorySource,
    table::{TextTable, print_table},
};

/// Everything a command needs to open a dashboard: the merged
/// configuration, the table to show and the directory it lives in.
#[derive(Debug)]
pub(crate) struct Session {
    pub config: DashboardConfig,
    pub table: String,
    pub source: DirectorySource,
}

impl Session {
    /// Merges `args` over the config file; flags win.
    pub fn resolve(config_path: Option<&Path>, args: &SourceArgs) -> Result<Self> {
        let mut config = DashboardConfig::load_or_default(config_path)?;
        if let Some(limit) = args.limit {
            config.row_limit = limit;
        }
        if let Some(source) = &args.source {
            config.source_dir = Some(source.clone());
        }
        if let Some(table) = &args.table {
            config.table = Some(table.clone());
        }
        config.validate()?;

        let table = config.table.clone().ok_or_else(|| {
            anyhow!("No table given; pass --table or set `table` in the config file")
        })?;
        let root = config
            .source_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
        let source = DirectorySource::new(root)
            .with_delimiter(args.delimiter)
            .with_encoding(encoding)
            .with_poll_interval(config.poll_interval());
        Ok(Self {
            config,
            table,
            source,
        })
    }

    pub fn dashboard(&self) -> Dashboard<DirectorySource> {
        Dashboard::from_config(self.source.clone(), self.table.clone(), &self.config)
    }
}

/// Turns a dashboard failure into a user-facing message with its hint.
pub(crate) fn explain(err: DashboardError) -> anyhow::Error {
    anyhow!("{err}. {}", err.recovery_hint())
}

pub(crate) fn print_report(
    dashboard: &Dashboard<DirectorySource>,
    format: OutputFormat,
    options: RenderOptions,
) -> Result<()> {
    match format {
        OutputFormat::Table => print!(
            "{}",
            report::render_text(
                dashboard.table(),
                dashboard.snapshot(),
                dashboard.insights(),
                options
            )
        ),
        OutputFormat::Json => println!(
            "{}",
            report::render_json(dashboard.table(), dashboard.snapshot(), dashboard.insights())?
        ),
    }
    Ok(())
}

pub fn execute(config_path: Option<&Path>, args: &SummaryArgs) -> Result<()> {
    let session = Session::resolve(config_path, &args.source)?;
    let mut dashboard = session.dashboard();
    dashboard.refresh().map_err(explain)?;
    info!(
        "Summarized {} row(s) of '{}' from {:?}",
        dashboard.row_count(),
        session.table,
        session.source.root()
    );
    print_report(
        &dashboard,
        args.format,
        RenderOptions {
            swatches: args.swatches,
        },
    )
}

pub fn execute_roles(config_path: Option<&Path>, args: &SourceArgs) -> Result<()> {
    let session = Session::resolve(config_path, args)?;
    let mut dashboard = session.dashboard();
    dashboard.refresh().map_err(explain)?;

    let sample = dashboard.rows().next();
    let keys = match dashboard.snapshot() {
        Some(snapshot) => snapshot.role_keys.clone(),
        None => infer_role_keys_with(sample, &session.config.roles),
    };
    let mut table = TextTable::new(["role", "column", "source", "present"]);
    for (role, key) in keys.iter() {
        let present = sample.is_some_and(|row| row.get(key).is_some());
        let origin = if session.config.roles.get(role).is_some() {
            "override"
        } else if present {
            "inferred"
        } else {
            "default"
        };
        table.push(vec![
            role.to_string(),
            key.to_string(),
            origin.to_string(),
            if present { "yes" } else { "no" }.to_string(),
        ]);
    }
    print_table(&table);
    if dashboard.snapshot().is_none() {
        println!("No data in '{}'; showing default columns.", session.table);
    }
    Ok(())
}
