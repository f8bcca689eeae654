//! Summary command implementation.

use std::path::Path;

use crate::cli::args::{OutputFormat, SummaryArgs};
use crate::cli::{connect, report_outcome};
use crate::core::summary::summarize;
use crate::error::Result;
use crate::render;

/// Execute the summary command.
///
/// # Errors
///
/// Invalid arguments, configuration and credential errors, or
/// `PartialFailure` after rendering when some models failed.
pub async fn execute(
    args: &SummaryArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    args.validate()?;

    let client = connect(config_path).await?;
    let report = client.query_all().await;
    let summaries = summarize(&report, args.top);

    println!(
        "{}",
        render::render_summary(&summaries, &report.errors, format, pretty, no_color)?
    );
    report_outcome(&report)
}
