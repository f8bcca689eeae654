//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::error::{CapacityError, ConfigurationError, Result};

/// Azure AI model capacity - query available deployment capacity by region.
#[derive(Parser, Debug)]
#[command(name = "azcap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Configuration file (JSON, or TOML by extension)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSON logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query raw capacity records (default command)
    Query(QueryArgs),

    /// Show region x model-version capacity tables per pricing tier
    Table(TableArgs),

    /// Summarize total capacity and best regions per model
    Summary(SummaryArgs),

    /// Write all capacity records to a JSON file
    Export(ExportArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Arguments for the `query` command.
#[derive(Parser, Debug, Default)]
pub struct QueryArgs {
    /// Only query this configured model
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,
}

/// Arguments for the `table` command.
#[derive(Parser, Debug)]
pub struct TableArgs {
    /// Only show this pricing tier (e.g. GlobalStandard)
    #[arg(long, value_name = "TIER")]
    pub sku: Option<String>,

    /// Region group (all, us, europe, asia) or a single region code
    #[arg(long, value_name = "REGION", default_value = "all")]
    pub region: String,

    /// Drop regions with no capacity in any column
    #[arg(long)]
    pub hide_empty: bool,

    /// Only show this column, e.g. "gpt-4o (2024-05-13)" (repeatable)
    #[arg(long = "column", value_name = "COLUMN")]
    pub columns: Vec<String>,
}

/// Arguments for the `summary` command.
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Number of best regions to list per model
    #[arg(long, value_name = "N", default_value = "3")]
    pub top: usize,
}

impl SummaryArgs {
    /// Validate argument values.
    ///
    /// # Errors
    ///
    /// Returns an `Invalid` configuration error when `--top` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.top == 0 {
            return Err(CapacityError::Config(ConfigurationError::Invalid {
                key: "--top".to_string(),
                message: "must be at least 1".to_string(),
            }));
        }
        Ok(())
    }
}

/// Arguments for the `export` command.
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Destination file
    #[arg(long, short, value_name = "PATH")]
    pub output: PathBuf,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Load and validate the configuration without querying
    Check,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    #[default]
    Human,
    /// JSON output
    Json,
    /// Markdown output
    Md,
}
