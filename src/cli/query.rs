//! Query command implementation.

use std::path::Path;

use crate::cli::args::{OutputFormat, QueryArgs};
use crate::cli::{connect, report_outcome};
use crate::core::models::QueryReport;
use crate::error::Result;
use crate::render;

/// Execute the query command.
///
/// # Errors
///
/// Configuration and credential errors, a failed single-model query, or
/// `PartialFailure` after rendering when some models failed.
pub async fn execute(
    args: &QueryArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    let client = connect(config_path).await?;

    let report = match &args.model {
        Some(name) => {
            let records = client.query_model(name).await?;
            let mut report = QueryReport::default();
            report.results.insert(name.clone(), records);
            report
        }
        None => client.query_all().await,
    };

    println!("{}", render::render_query(&report, format, pretty, no_color)?);
    report_outcome(&report)
}
