//! Robot-mode output (JSON and Markdown).
//!
//! JSON output is always wrapped in [`RobotOutput`] so consumers can check
//! `schemaVersion` and `command` before reading `data`.

use serde::Serialize;

use crate::core::aggregate::CapacityTable;
use crate::core::models::{ModelQueryError, QueryReport, RobotOutput};
use crate::core::summary::ModelSummary;
use crate::error::Result;

/// Render any value as JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json<T: Serialize>(output: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    })
}

fn error_strings(errors: &[ModelQueryError]) -> Vec<String> {
    errors.iter().map(ToString::to_string).collect()
}

/// `query` as a JSON envelope around the full report.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_query_json(report: &QueryReport, pretty: bool) -> Result<String> {
    let output = RobotOutput::new("query", report, error_strings(&report.errors));
    render_json(&output, pretty)
}

/// `table` as a JSON envelope around the tables.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_tables_json(
    tables: &[CapacityTable],
    errors: &[ModelQueryError],
    pretty: bool,
) -> Result<String> {
    let output = RobotOutput::new("table", tables, error_strings(errors));
    render_json(&output, pretty)
}

/// `summary` as a JSON envelope around the summaries.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_summary_json(
    summaries: &[ModelSummary],
    errors: &[ModelQueryError],
    pretty: bool,
) -> Result<String> {
    let output = RobotOutput::new("summary", summaries, error_strings(errors));
    render_json(&output, pretty)
}

fn md_errors(errors: &[ModelQueryError]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Errors\n\n");
    for error in errors {
        out.push_str(&format!("- {error}\n"));
    }
    out
}

/// Render `query` as Markdown.
#[must_use]
pub fn render_query_md(report: &QueryReport) -> String {
    let mut out = String::new();

    for (model, records) in &report.results {
        out.push_str(&format!("## {model}\n\n"));
        if records.is_empty() {
            out.push_str(if report.failed(model) {
                "- status: failed\n\n"
            } else {
                "- status: no_data\n\n"
            });
            continue;
        }

        out.push_str("| location | sku | capacity | finetune | version |\n");
        out.push_str("|---|---|---:|---:|---|\n");
        for r in records {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                r.location,
                r.sku_name,
                r.available_capacity,
                r.available_finetune_capacity,
                r.model_version
            ));
        }
        out.push('\n');
    }

    out.push_str(&md_errors(&report.errors));
    out
}

/// Render one capacity table as a Markdown table.
#[must_use]
pub fn render_table_md(table: &CapacityTable) -> String {
    let title = table.tier.as_deref().unwrap_or("All tiers");
    let mut out = format!("## {title}\n\n");

    if table.is_empty() {
        out.push_str("- status: no_data\n");
        return out;
    }

    out.push_str("| region |");
    for column in &table.columns {
        out.push_str(&format!(" {column} |"));
    }
    out.push_str("\n|---|");
    out.push_str(&"---:|".repeat(table.columns.len()));
    out.push('\n');

    for row in &table.rows {
        out.push_str(&format!("| {} |", row.region));
        for column in &table.columns {
            out.push_str(&format!(" {} |", row.get(column)));
        }
        out.push('\n');
    }
    out
}

/// Render several tables, then any errors.
#[must_use]
pub fn render_tables_md(tables: &[CapacityTable], errors: &[ModelQueryError]) -> String {
    let mut out = tables
        .iter()
        .map(render_table_md)
        .collect::<Vec<_>>()
        .join("\n");
    if !errors.is_empty() {
        out.push('\n');
        out.push_str(&md_errors(errors));
    }
    out
}

/// Render summaries as Markdown.
#[must_use]
pub fn render_summary_md(summaries: &[ModelSummary], errors: &[ModelQueryError]) -> String {
    let mut out = String::new();

    for s in summaries {
        out.push_str(&format!("## {}\n", s.model));
        if s.failed {
            out.push_str("- status: failed\n\n");
            continue;
        }
        out.push_str(&format!("- total_capacity: {}\n", s.total_capacity));
        out.push_str(&format!("- total_finetune_capacity: {}\n", s.total_finetune_capacity));
        out.push_str(&format!("- regions: {}\n", s.regions));
        for (rank, region) in s.top_regions.iter().enumerate() {
            out.push_str(&format!(
                "- top_{}: {} ({})\n",
                rank + 1,
                region.region,
                region.capacity
            ));
        }
        out.push('\n');
    }

    out.push_str(&md_errors(errors));
    out
}
