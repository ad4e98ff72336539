use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about = "Live financial summaries over arbitrary tables", long_about = None)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a table once and print monthly, category and ranking summaries
    Summary(SummaryArgs),
    /// Show which column plays each role in a table
    Roles(SourceArgs),
    /// Follow a table for inserted rows and re-render on every change
    Watch(WatchArgs),
    /// Generate AI insights for the newest rows of a table
    Insights(InsightsArgs),
    /// Manage configuration files
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Directory holding table files (<name>.csv, .tsv, .jsonl, .ndjson)
    #[arg(short = 's', long = "source")]
    pub source: Option<PathBuf>,
    /// Table to load
    #[arg(short = 't', long = "table")]
    pub table: Option<String>,
    /// Maximum rows kept in memory (defaults to 1000)
    #[arg(long)]
    pub limit: Option<usize>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of table files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Paint category color swatches
    #[arg(long)]
    pub swatches: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Milliseconds between checks of the table file
    #[arg(long = "interval-ms")]
    pub interval_ms: Option<u64>,
    /// Stop after this many live rows have been applied
    #[arg(long = "max-updates")]
    pub max_updates: Option<usize>,
    /// Request AI insights when data first arrives
    #[arg(long)]
    pub insights: bool,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Paint category color swatches
    #[arg(long)]
    pub swatches: bool,
}

#[derive(Debug, Args)]
pub struct InsightsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Seconds to wait for the insight service
    #[arg(long = "wait-secs", default_value_t = 60)]
    pub wait_secs: u64,
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file populated with defaults
    Init(ConfigInitArgs),
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Destination file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Table to record as the active table
    #[arg(short = 't', long = "table")]
    pub table: Option<String>,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
