//! Output rendering for human and robot modes.

pub mod human;
pub mod robot;

use crate::cli::args::OutputFormat;
use crate::core::aggregate::CapacityTable;
use crate::core::models::{ModelQueryError, QueryReport};
use crate::core::summary::ModelSummary;
use crate::error::Result;

/// Render `query` results.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_query(
    report: &QueryReport,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_query(report, no_color)),
        OutputFormat::Json => robot::render_query_json(report, pretty),
        OutputFormat::Md => Ok(robot::render_query_md(report)),
    }
}

/// Render `table` results.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_tables(
    tables: &[CapacityTable],
    errors: &[ModelQueryError],
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_tables(tables, errors, no_color)),
        OutputFormat::Json => robot::render_tables_json(tables, errors, pretty),
        OutputFormat::Md => Ok(robot::render_tables_md(tables, errors)),
    }
}

/// Render `summary` results.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_summary(
    summaries: &[ModelSummary],
    errors: &[ModelQueryError],
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<String> {
    match format {
        OutputFormat::Human => Ok(human::render_summary(summaries, errors, no_color)),
        OutputFormat::Json => robot::render_summary_json(summaries, errors, pretty),
        OutputFormat::Md => Ok(robot::render_summary_md(summaries, errors)),
    }
}
