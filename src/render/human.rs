//! Human-readable terminal output.
//!
//! Every function takes `no_color`; with it set the output is plain text.
//! Tables are laid out by `comfy_table`, which styles cells after measuring
//! them.

use colored::{ColoredString, Colorize};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::core::aggregate::CapacityTable;
use crate::core::models::{ModelQueryError, QueryReport};
use crate::core::summary::ModelSummary;
use crate::storage::config::{CapacityConfig, ConfigSource};

const RULE_WIDTH: usize = 80;

/// Capacity band used for cell coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityBand {
    None,
    /// 1-99
    Low,
    /// 100-999
    Medium,
    /// 1,000 and up
    High,
}

impl CapacityBand {
    #[must_use]
    pub const fn of(capacity: u64) -> Self {
        match capacity {
            0 => Self::None,
            1..=99 => Self::Low,
            100..=999 => Self::Medium,
            _ => Self::High,
        }
    }
}

fn paint(text: &str, no_color: bool, style: impl Fn(&str) -> ColoredString) -> String {
    if no_color {
        text.to_string()
    } else {
        style(text).to_string()
    }
}

fn paint_capacity(text: &str, capacity: u64, no_color: bool) -> String {
    paint(text, no_color, |s| match CapacityBand::of(capacity) {
        CapacityBand::None => s.dimmed(),
        CapacityBand::Low => s.red(),
        CapacityBand::Medium => s.yellow(),
        CapacityBand::High => s.green(),
    })
}

/// Group digits in thousands: `12345` → `12,345`.
#[must_use]
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn render_errors(errors: &[ModelQueryError], no_color: bool) -> String {
    let mut out = String::new();
    for error in errors {
        let label = paint("✗", no_color, |s| s.red().bold());
        let attempts = error
            .attempts
            .map(|n| format!(" ({n} attempt(s))"))
            .unwrap_or_default();
        out.push_str(&format!("{label} {error}{attempts}\n"));
    }
    out
}

/// Render raw capacity records, one block per model.
#[must_use]
pub fn render_query(report: &QueryReport, no_color: bool) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    out.push_str(&format!("{rule}\n"));
    out.push_str(&paint("Azure AI Model Capacity Report", no_color, |s| s.bold().cyan()));
    out.push_str(&format!("\n{rule}\n"));

    for (model, records) in &report.results {
        out.push_str(&format!(
            "\n{}\n{}\n",
            paint(&format!("Model: {model}"), no_color, |s| s.bold()),
            "-".repeat(40)
        ));

        if records.is_empty() {
            let reason = if report.failed(model) {
                "  Query failed"
            } else {
                "  No capacity data available"
            };
            out.push_str(&paint(reason, no_color, |s| s.dimmed()));
            out.push('\n');
            continue;
        }

        for record in records {
            let capacity = paint_capacity(
                &format_count(record.available_capacity),
                record.available_capacity,
                no_color,
            );
            out.push_str(&format!("  Location: {}\n", record.location));
            out.push_str(&format!("  SKU: {}\n", record.sku_name));
            out.push_str(&format!("  Available Capacity: {capacity}\n"));
            out.push_str(&format!(
                "  Available Finetune Capacity: {}\n",
                format_count(record.available_finetune_capacity)
            ));
            out.push_str(&format!("  Model Version: {}\n", record.model_version));
            if record.incomplete {
                let note = "  (some fields were missing or out of range)";
                out.push_str(&paint(note, no_color, |s| s.dimmed()));
                out.push('\n');
            }
            out.push('\n');
        }
    }

    out.push_str(&format!("{rule}\n"));
    out.push_str(&render_errors(&report.errors, no_color));
    out
}

fn band_color(capacity: u64) -> Color {
    match CapacityBand::of(capacity) {
        CapacityBand::None => Color::DarkGrey,
        CapacityBand::Low => Color::Red,
        CapacityBand::Medium => Color::Yellow,
        CapacityBand::High => Color::Green,
    }
}

fn capacity_cell(capacity: u64) -> Cell {
    Cell::new(format_count(capacity))
        .fg(band_color(capacity))
        .set_alignment(CellAlignment::Right)
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold).fg(Color::Cyan)
}

fn new_table(no_color: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    if no_color {
        table.force_no_tty();
    } else {
        table.enforce_styling();
    }
    table
}

/// Render one capacity table with its tier as a heading.
#[must_use]
pub fn render_table(table: &CapacityTable, no_color: bool) -> String {
    let title = table.tier.as_deref().unwrap_or("All tiers");
    let mut out = format!(
        "{}\n",
        paint(&format!("{title} - Model Capacity by Region"), no_color, |s| s
            .bold()
            .cyan())
    );

    if table.is_empty() {
        out.push_str(&paint("  No regions with capacity data", no_color, |s| s.dimmed()));
        out.push('\n');
        return out;
    }

    let mut grid = new_table(no_color);
    grid.set_header(
        std::iter::once(header_cell("Region"))
            .chain(table.columns.iter().map(|c| header_cell(c)))
            .collect::<Vec<_>>(),
    );
    for row in &table.rows {
        grid.add_row(
            std::iter::once(Cell::new(&row.region))
                .chain(table.columns.iter().map(|c| capacity_cell(row.get(c))))
                .collect::<Vec<_>>(),
        );
    }

    out.push_str(&grid.to_string());
    out.push('\n');
    out
}

/// Render several tables separated by blank lines, then any errors.
#[must_use]
pub fn render_tables(
    tables: &[CapacityTable],
    errors: &[ModelQueryError],
    no_color: bool,
) -> String {
    let mut out = tables
        .iter()
        .map(|t| render_table(t, no_color))
        .collect::<Vec<_>>()
        .join("\n");
    if tables.is_empty() {
        out.push_str(&paint("No capacity data", no_color, |s| s.dimmed()));
        out.push('\n');
    }
    out.push_str(&render_errors(errors, no_color));
    out
}

/// Render per-model summaries as one table row per model.
#[must_use]
pub fn render_summary(
    summaries: &[ModelSummary],
    errors: &[ModelQueryError],
    no_color: bool,
) -> String {
    let mut out = format!(
        "{}\n",
        paint("Model Capacity Summary", no_color, |s| s.bold().cyan())
    );

    let mut grid = new_table(no_color);
    grid.set_header(vec![
        header_cell("Model"),
        header_cell("Capacity"),
        header_cell("Finetune"),
        header_cell("Regions"),
        header_cell("Best regions"),
    ]);

    for s in summaries {
        let model = Cell::new(&s.model).add_attribute(Attribute::Bold);
        if s.failed || s.regions == 0 {
            let (note, color) = if s.failed {
                ("Query failed", Color::Red)
            } else {
                ("No capacity data", Color::DarkGrey)
            };
            grid.add_row(vec![
                model,
                Cell::new(note).fg(color),
                Cell::new("-"),
                Cell::new("-"),
                Cell::new("-"),
            ]);
            continue;
        }

        let best = s
            .top_regions
            .iter()
            .enumerate()
            .map(|(rank, r)| format!("{}. {}: {}", rank + 1, r.region, format_count(r.capacity)))
            .collect::<Vec<_>>()
            .join("\n");
        grid.add_row(vec![
            model,
            capacity_cell(s.total_capacity),
            Cell::new(format_count(s.total_finetune_capacity)).set_alignment(CellAlignment::Right),
            Cell::new(s.regions).set_alignment(CellAlignment::Right),
            Cell::new(best),
        ]);
    }

    out.push_str(&grid.to_string());
    out.push('\n');
    out.push_str(&render_errors(errors, no_color));
    out
}

/// Render the result of `config check`.
#[must_use]
pub fn render_config_check(
    config: &CapacityConfig,
    path: &std::path::Path,
    source: ConfigSource,
    no_color: bool,
) -> String {
    let ok = paint("✓", no_color, |s| s.green().bold());
    let mut out = format!(
        "{ok} Configuration is valid: {} ({source})\n",
        path.display()
    );
    out.push_str(&format!("  Subscription: {}\n", config.azure.subscription_id));
    if let Some(name) = &config.azure.subscription_name {
        out.push_str(&format!("  Subscription name: {name}\n"));
    }
    out.push_str(&format!("  API version: {}\n", config.azure.api_version));
    out.push_str(&format!("  Endpoint: {}\n", config.azure.base_url));

    let settings = &config.request_settings;
    out.push_str(&format!(
        "  Requests: timeout {}s, {} attempt(s), retry delay {:.1}s, concurrency {}\n",
        settings.timeout.as_secs(),
        settings.retry_attempts,
        settings.retry_delay.as_secs_f64(),
        settings.max_concurrency
    ));

    out.push_str(&format!("  Models ({}):\n", config.models.len()));
    for (key, spec) in &config.models {
        out.push_str(&format!(
            "    {key}: {} {} {}\n",
            spec.model_format, spec.model_name, spec.model_version
        ));
    }
    out
}
