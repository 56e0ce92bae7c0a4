pub mod run;
pub mod schema;
pub mod tools;

use addrscan::config::Config;
use addrscan::output::ReportFormat;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG: &str = "addrscan.yaml";

#[derive(Parser)]
#[command(name = "addrscan")]
#[command(
    author,
    version,
    about = "Run analysis tools against an address concurrently and aggregate the results"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze an address with the configured tools
    Run(RunArgs),

    /// List configured tools
    Tools(ToolsArgs),

    /// Print JSON Schema for config validation
    Schema,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    /// Address to analyze
    #[arg(short, long, env = "ADDRSCAN_ADDRESS")]
    pub address: String,

    /// Path to config file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Run specific tools only (comma-separated); defaults to every enabled tool
    #[arg(long, value_delimiter = ',')]
    pub tools: Option<Vec<String>>,

    /// Options passed to every tool, as a JSON object
    #[arg(long)]
    pub options: Option<String>,

    /// Override max parallel tool invocations
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override the per-attempt timeout, including tools that set their own
    #[arg(long)]
    pub timeout_sec: Option<u64>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
    pub format: ReportFormat,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How often to poll run progress, in milliseconds
    #[arg(long, default_value_t = 250)]
    pub poll_ms: u64,

    /// Exit 1 if any tool failed (CI mode)
    #[arg(long)]
    pub fail_on_error: bool,
}

#[derive(Parser, Clone)]
pub struct ToolsArgs {
    /// Path to config file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

/// Load the config. Only the default path may be absent, in which case
/// defaults are used.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = if path.exists() || path != Path::new(DEFAULT_CONFIG) {
        debug!("Loading config from {:?}", path);
        Config::load(path)?
    } else {
        debug!("No config at {:?}, using defaults", path);
        Config::default()
    };
    config.validate()?;
    Ok(config)
}
