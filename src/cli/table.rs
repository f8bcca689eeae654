//! Table command implementation.

use std::path::Path;

use crate::cli::args::{OutputFormat, TableArgs};
use crate::cli::{connect, report_outcome};
use crate::core::aggregate::{
    CapacityTable, RegionGroup, aggregate, aggregate_by_tier, order_tiers,
};
use crate::core::models::QueryReport;
use crate::error::Result;
use crate::render;

/// Build the tables requested by `args` from a finished report.
///
/// With `--sku` a single table is produced. Otherwise one table per observed
/// tier, well-known tiers first.
#[must_use]
pub fn build_tables(report: &QueryReport, args: &TableArgs) -> Vec<CapacityTable> {
    let tables = match &args.sku {
        Some(tier) => vec![aggregate(&report.results, Some(tier))],
        None => {
            let mut by_tier = aggregate_by_tier(&report.results);
            let tiers: Vec<String> = by_tier.keys().cloned().collect();
            order_tiers(&tiers)
                .iter()
                .filter_map(|tier| by_tier.remove(tier))
                .collect()
        }
    };

    let group = RegionGroup::from_arg(&args.region);
    tables
        .into_iter()
        .map(|table| {
            let table = table.filter_regions(&group);
            let table = if args.columns.is_empty() {
                table
            } else {
                table.select_columns(&args.columns)
            };
            if args.hide_empty {
                table.without_empty_rows()
            } else {
                table
            }
        })
        .collect()
}

/// Execute the table command.
///
/// # Errors
///
/// Configuration and credential errors, or `PartialFailure` after rendering
/// when some models failed.
pub async fn execute(
    args: &TableArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    pretty: bool,
    no_color: bool,
) -> Result<()> {
    let client = connect(config_path).await?;
    let report = client.query_all().await;

    let tables = build_tables(&report, args);
    tracing::debug!(tables = tables.len(), region = %args.region, "Built capacity tables");

    println!(
        "{}",
        render::render_tables(&tables, &report.errors, format, pretty, no_color)?
    );
    report_outcome(&report)
}
