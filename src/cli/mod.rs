//! CLI argument parsing and command dispatch.

pub mod args;
pub mod config;
pub mod export;
pub mod query;
pub mod summary;
pub mod table;

use std::path::Path;

pub use args::{Cli, Commands, OutputFormat};

use crate::core::credential::DefaultCredential;
use crate::core::models::{QueryReport, QueryState};
use crate::core::pipeline::CapacityClient;
use crate::error::{CapacityError, Result};
use crate::storage::config::{CapacityConfig, resolve_config_path};

/// Load configuration from the resolved path and build a client with the
/// default credential chain. Fails before any query when no token is available.
pub(crate) async fn connect(
    config_path: Option<&Path>,
) -> Result<CapacityClient<DefaultCredential>> {
    let (path, source) = resolve_config_path(config_path);
    tracing::debug!(path = %path.display(), %source, "Resolved config path");
    let config = CapacityConfig::load_from(&path)?;
    CapacityClient::new(config, DefaultCredential::default()).await
}

/// Map a finished report to the command result.
///
/// A report without errors is success. When every model failed on
/// authentication the run is an auth failure; any other failure mix is a
/// partial failure.
pub(crate) fn report_outcome(report: &QueryReport) -> Result<()> {
    if !report.has_errors() {
        return Ok(());
    }

    let all_failed = report.errors.len() == report.results.len();
    if all_failed && report.errors.iter().all(|e| e.state == QueryState::AuthFailed) {
        let reason = report
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        return Err(CapacityError::AuthFailed { reason });
    }

    Err(CapacityError::PartialFailure {
        failed: report.errors.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ModelQueryError;
    use crate::error::ExitCode;

    fn error(model: &str, state: QueryState) -> ModelQueryError {
        ModelQueryError {
            model: model.to_string(),
            state,
            message: "failed".to_string(),
            attempts: Some(1),
        }
    }

    #[test]
    fn clean_report_is_success() {
        let mut report = QueryReport::default();
        report.results.insert("gpt-4o".to_string(), vec![]);
        assert!(report_outcome(&report).is_ok());
    }

    #[test]
    fn all_auth_failures_are_auth_error() {
        let mut report = QueryReport::default();
        report.results.insert("a".to_string(), vec![]);
        report.results.insert("b".to_string(), vec![]);
        report.errors = vec![
            error("a", QueryState::AuthFailed),
            error("b", QueryState::AuthFailed),
        ];

        let err = report_outcome(&report).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::AuthError);
    }

    #[test]
    fn mixed_failures_are_partial() {
        let mut report = QueryReport::default();
        report.results.insert("a".to_string(), vec![]);
        report.results.insert("b".to_string(), vec![]);
        report.errors = vec![error("a", QueryState::Exhausted)];

        let err = report_outcome(&report).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::PartialFailure);
    }
}
