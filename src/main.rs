//! azcap - Azure AI model capacity reporter
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use azcap::cli::args::QueryArgs;
use azcap::cli::{Cli, Commands};
use azcap::core::logging::{self, LogSettings};
use azcap::error::CapacityError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(&LogSettings::resolve(
        cli.log_level.as_deref(),
        cli.json_output,
        cli.verbose,
    ));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> azcap::Result<()> {
    let format = cli.effective_format();
    let pretty = cli.pretty;
    let no_color = !azcap::util::env::should_use_color(cli.no_color);
    let config = cli.config.as_deref();

    match cli.command {
        None => {
            azcap::cli::query::execute(&QueryArgs::default(), config, format, pretty, no_color)
                .await
        }
        Some(Commands::Query(args)) => {
            azcap::cli::query::execute(&args, config, format, pretty, no_color).await
        }
        Some(Commands::Table(args)) => {
            azcap::cli::table::execute(&args, config, format, pretty, no_color).await
        }
        Some(Commands::Summary(args)) => {
            azcap::cli::summary::execute(&args, config, format, pretty, no_color).await
        }
        Some(Commands::Export(args)) => {
            azcap::cli::export::execute(&args, config, format, pretty).await
        }
        Some(Commands::Config(cmd)) => {
            azcap::cli::config::execute(&cmd, config, format, pretty, no_color)
        }
    }
}

/// Print a failed run to stderr. Partial failures were already rendered.
fn report_error(e: &CapacityError) {
    tracing::error!(code = e.error_code(), category = %e.category(), "{e}");
    if matches!(e, CapacityError::PartialFailure { .. }) {
        eprintln!("Warning: {e}");
        return;
    }
    eprintln!("Error [{}]: {e}", e.error_code());
    if let Some(hint) = e.hint() {
        eprintln!("Hint: {hint}");
    }
}
