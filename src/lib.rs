//! Live financial summaries over arbitrary tables.
//!
//! The engine takes rows of unknown shape, infers which columns hold the
//! date, category, revenue, expense, profit and identifier
//! ([`roles`]), normalizes every row ([`normalize`]), folds them into
//! monthly and per-category aggregates ([`aggregate`]), assigns stable
//! category colors ([`palette`]) and projects ranking views
//! ([`rankings`]). [`dashboard::Dashboard`] drives that pipeline from a
//! [`source::DataSource`], keeps a bounded row buffer current with live
//! inserts, and requests narrative insights from an
//! [`insights::InsightGenerator`].

pub mod aggregate;
pub mod buffer;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod insights;
pub mod io_utils;
pub mod normalize;
pub mod palette;
pub mod rankings;
pub mod report;
pub mod roles;
pub mod snapshot;
pub mod source;
pub mod summary;
pub mod table;
pub mod value;
pub mod watch;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, ConfigCommands, ConfigInitArgs},
    config::DashboardConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("finpulse", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Summary(args) => summary::execute(config_path, &args),
        Commands::Roles(args) => summary::execute_roles(config_path, &args),
        Commands::Watch(args) => watch::execute(config_path, &args),
        Commands::Insights(args) => watch::execute_insights(config_path, &args),
        Commands::Config(args) => match args.command {
            ConfigCommands::Init(init) => handle_config_init(&init),
        },
    }
}

fn handle_config_init(args: &ConfigInitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "Config file {:?} already exists; pass --force to overwrite",
            args.output
        );
    }
    let config = DashboardConfig {
        table: args.table.clone(),
        ..DashboardConfig::default()
    };
    config.validate()?;
    config
        .save(&args.output)
        .with_context(|| format!("Writing config to {:?}", args.output))?;
    info!("Default configuration written to {:?}", args.output);
    Ok(())
}
