//! Core data models.
//!
//! These types are the data surface shared by the query pipeline, the
//! aggregator, and every renderer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Model Query Spec
// =============================================================================

/// One queryable model configuration.
///
/// Created from configuration at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelQuerySpec {
    /// Model format as the provider names it (e.g. `OpenAI`).
    pub model_format: String,
    /// Model name (e.g. `gpt-4o`).
    pub model_name: String,
    /// Model version (e.g. `2024-05-13`).
    pub model_version: String,
}

// =============================================================================
// Capacity Record
// =============================================================================

/// Available capacity for one (region, SKU, model-version) tuple.
///
/// Produced by [`crate::core::normalize::normalize`]; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub model_name: String,
    /// Region code, e.g. `eastus`.
    pub location: String,
    /// Pricing tier, e.g. `GlobalStandard`.
    pub sku_name: String,
    pub available_capacity: u64,
    pub available_finetune_capacity: u64,
    pub model_format: String,
    pub model_version: String,
    /// Set when one or more fields were missing from the payload and were
    /// filled with their zero value.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub incomplete: bool,
}

// =============================================================================
// Query Report
// =============================================================================

/// Terminal and intermediate states of a single model query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryState {
    Pending,
    TokenAcquired,
    Requesting,
    Succeeded,
    /// Retries exhausted, or a non-retryable non-auth failure.
    Exhausted,
    /// Credential could not be obtained, or the endpoint answered 401/403.
    AuthFailed,
}

impl QueryState {
    /// Whether the query has finished (successfully or not).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted | Self::AuthFailed)
    }
}

/// Why one model's query produced no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelQueryError {
    /// Configured model key.
    pub model: String,
    /// Terminal state the query ended in.
    pub state: QueryState,
    /// Human-readable failure reason.
    pub message: String,
    /// HTTP attempts made, when the failure came from the request executor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl std::fmt::Display for ModelQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.model, self.message)
    }
}

/// Output of one full orchestration pass.
///
/// Every configured model appears in `results`. A model whose query failed
/// maps to an empty vector and has a matching entry in `errors`; a model that
/// legitimately returned no regions maps to an empty vector with no error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryReport {
    pub results: BTreeMap<String, Vec<CapacityRecord>>,
    pub errors: Vec<ModelQueryError>,
}

impl QueryReport {
    /// Whether the named model's query failed.
    #[must_use]
    pub fn failed(&self, model: &str) -> bool {
        self.errors.iter().any(|e| e.model == model)
    }

    /// Total number of records across all models.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    /// Whether at least one model failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// =============================================================================
// Robot Output Envelope
// =============================================================================

/// Schema version for machine-readable output.
pub const SCHEMA_VERSION: &str = "azcap.v1";

/// Envelope for JSON output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T: Serialize> {
    pub schema_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub command: &'static str,
    pub data: T,
    pub errors: Vec<String>,
}

impl<T: Serialize> RobotOutput<T> {
    /// Wrap `data` for the given command.
    #[must_use]
    pub fn new(command: &'static str, data: T, errors: Vec<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            command,
            data,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str) -> CapacityRecord {
        CapacityRecord {
            model_name: model.to_string(),
            location: "eastus".to_string(),
            sku_name: "Standard".to_string(),
            available_capacity: 10,
            available_finetune_capacity: 0,
            model_format: "OpenAI".to_string(),
            model_version: "1".to_string(),
            incomplete: false,
        }
    }

    #[test]
    fn complete_records_omit_incomplete_flag() {
        let json = serde_json::to_value(record("gpt-4o")).unwrap();
        assert!(json.get("incomplete").is_none());
        assert_eq!(json["available_capacity"], 10);
    }

    #[test]
    fn report_distinguishes_failed_from_empty() {
        let mut report = QueryReport::default();
        report.results.insert("o3".to_string(), vec![]);
        report.results.insert("o4".to_string(), vec![]);
        report.results.insert("gpt-4o".to_string(), vec![record("gpt-4o")]);
        report.errors.push(ModelQueryError {
            model: "o4".to_string(),
            state: QueryState::Exhausted,
            message: "boom".to_string(),
            attempts: Some(3),
        });

        assert!(!report.failed("o3"));
        assert!(report.failed("o4"));
        assert_eq!(report.record_count(), 1);
        assert!(report.has_errors());
    }

    #[test]
    fn terminal_states() {
        assert!(!QueryState::Pending.is_terminal());
        assert!(!QueryState::Requesting.is_terminal());
        assert!(QueryState::AuthFailed.is_terminal());
        assert!(QueryState::Succeeded.is_terminal());
    }
}
