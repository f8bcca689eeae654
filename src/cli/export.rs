//! Export command implementation.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::args::{ExportArgs, OutputFormat};
use crate::cli::{connect, report_outcome};
use crate::core::models::{CapacityRecord, ModelQueryError, QueryReport, RobotOutput};
use crate::error::Result;
use crate::render::robot;
use crate::storage::config::AzureSettings;

/// On-disk export document.
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    pub generated_at: DateTime<Utc>,
    pub subscription_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_name: Option<&'a str>,
    pub models: &'a BTreeMap<String, Vec<CapacityRecord>>,
    pub errors: &'a [ModelQueryError],
}

impl<'a> ExportDocument<'a> {
    #[must_use]
    pub fn new(azure: &'a AzureSettings, report: &'a QueryReport) -> Self {
        Self {
            generated_at: Utc::now(),
            subscription_id: &azure.subscription_id,
            subscription_name: azure.subscription_name.as_deref(),
            models: &report.results,
            errors: &report.errors,
        }
    }
}

/// Write `document` as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns an I/O or serialization error.
pub fn write_export(path: &Path, document: &ExportDocument<'_>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, robot::render_json(document, true)?)?;
    Ok(())
}

/// Execute the export command.
///
/// # Errors
///
/// Configuration and credential errors, I/O errors writing the file, or
/// `PartialFailure` after writing when some models failed.
pub async fn execute(
    args: &ExportArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let client = connect(config_path).await?;
    let report = client.query_all().await;

    let document = ExportDocument::new(&client.config().azure, &report);
    write_export(&args.output, &document)?;
    tracing::info!(
        path = %args.output.display(),
        records = report.record_count(),
        "Export written"
    );

    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "path": args.output.display().to_string(),
                "models": report.results.len(),
                "records": report.record_count(),
                "failed": report.errors.len(),
            });
            let output = RobotOutput::new(
                "export",
                summary,
                report.errors.iter().map(ToString::to_string).collect(),
            );
            println!("{}", robot::render_json(&output, pretty)?);
        }
        OutputFormat::Human | OutputFormat::Md => {
            println!(
                "Exported {} record(s) for {} model(s) to {}",
                report.record_count(),
                report.results.len(),
                args.output.display()
            );
            for error in &report.errors {
                eprintln!("Error: {error}");
            }
        }
    }

    report_outcome(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn export_document_shape() {
        let azure = AzureSettings {
            subscription_id: "sub-1".to_string(),
            api_version: "2024-10-01".to_string(),
            base_url: "https://management.azure.com".to_string(),
            subscription_name: Some("Production".to_string()),
        };
        let mut report = QueryReport::default();
        report.results.insert("o3".to_string(), vec![]);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.json");
        write_export(&path, &ExportDocument::new(&azure, &report)).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["subscription_id"], "sub-1");
        assert_eq!(value["subscription_name"], "Production");
        assert_eq!(value["models"]["o3"], serde_json::json!([]));
        assert_eq!(value["errors"], serde_json::json!([]));
        assert!(value["generated_at"].is_string());
    }
}
