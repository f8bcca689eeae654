//! Test utilities for azcap.
//!
//! Provides shared fixtures, test data factories, and assertion macros
//! for use across unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use azcap::test_utils::*;
//!
//! let record = make_test_record("eastus", "GlobalStandard", 100);
//! let dir = TestDir::new();
//! let path = dir.write_config(&make_test_config_json("http://127.0.0.1:1", &["gpt-4o"]));
//! ```

use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use crate::core::credential::{AccessToken, CredentialProvider};
use crate::core::models::{CapacityRecord, ModelQuerySpec};
use crate::error::{CapacityError, Result};
use crate::storage::config::{CapacityConfig, RequestSettings};

/// Token returned by [`TestCredential`].
pub const TEST_TOKEN: &str = "test-token";
/// Subscription id used by config fixtures.
pub const TEST_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";
/// API version used by config fixtures.
pub const TEST_API_VERSION: &str = "2024-10-01";

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create a complete `CapacityRecord` for model `gpt-4o`, version `2024-05-13`.
#[must_use]
pub fn make_test_record(location: &str, sku: &str, capacity: u64) -> CapacityRecord {
    CapacityRecord {
        model_name: "gpt-4o".to_string(),
        location: location.to_string(),
        sku_name: sku.to_string(),
        available_capacity: capacity,
        available_finetune_capacity: 0,
        model_format: "OpenAI".to_string(),
        model_version: "2024-05-13".to_string(),
        incomplete: false,
    }
}

/// Query parameters for a configured model named `name`.
#[must_use]
pub fn make_test_model_spec(name: &str) -> ModelQuerySpec {
    ModelQuerySpec {
        model_format: "OpenAI".to_string(),
        model_name: name.to_string(),
        model_version: "2024-05-13".to_string(),
    }
}

/// One entry of a capacity response `value` array.
#[must_use]
pub fn make_test_capacity_entry(model: &str, location: &str, sku: &str, capacity: u64) -> Value {
    json!({
        "id": format!("/subscriptions/{TEST_SUBSCRIPTION}/providers/Microsoft.CognitiveServices/locations/{location}/models/{model}"),
        "location": location,
        "name": sku,
        "properties": {
            "model": {"format": "OpenAI", "name": model, "version": "2024-05-13"},
            "skuName": sku,
            "availableCapacity": capacity,
            "availableFinetuneCapacity": 0
        }
    })
}

/// A capacity response document wrapping `entries`.
#[must_use]
pub fn make_test_capacity_response(entries: Vec<Value>) -> Value {
    json!({ "value": entries })
}

/// A config JSON document pointing at `base_url` with the given model keys.
///
/// Retries are fast (`retry_delay` 10ms) so retry tests stay quick.
#[must_use]
pub fn make_test_config_json(base_url: &str, models: &[&str]) -> String {
    let models: serde_json::Map<String, Value> = models
        .iter()
        .map(|m| {
            (
                (*m).to_string(),
                json!({"model_format": "OpenAI", "model_name": m, "model_version": "2024-05-13"}),
            )
        })
        .collect();

    json!({
        "azure": {
            "subscription_id": TEST_SUBSCRIPTION,
            "api_version": TEST_API_VERSION,
            "base_url": base_url,
        },
        "models": models,
        "request_settings": {"timeout": 5, "retry_attempts": 3, "retry_delay": 0.01},
    })
    .to_string()
}

/// A validated config pointing at `base_url`.
///
/// # Panics
///
/// Panics if the fixture JSON fails validation.
#[must_use]
pub fn make_test_config(base_url: &str, models: &[&str]) -> CapacityConfig {
    CapacityConfig::from_json_str(&make_test_config_json(base_url, models))
        .expect("test config must be valid")
}

/// Override retry settings on a config fixture.
#[must_use]
pub fn with_retries(mut config: CapacityConfig, attempts: u32, delay: Duration) -> CapacityConfig {
    config.request_settings = RequestSettings {
        retry_attempts: attempts,
        retry_delay: delay,
        ..config.request_settings
    };
    config
}

// =============================================================================
// Credentials
// =============================================================================

/// Credential that hands out [`TEST_TOKEN`] and counts requests.
#[derive(Debug, Default)]
pub struct TestCredential {
    calls: AtomicUsize,
}

impl TestCredential {
    /// Number of `get_token` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialProvider for TestCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken::new(TEST_TOKEN, None))
    }
}

/// Credential that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCredential;

impl CredentialProvider for FailingCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        Err(CapacityError::AuthFailed {
            reason: "no credential configured".to_string(),
        })
    }
}

/// Credential that hands out a fixed number of tokens, then fails.
#[derive(Debug)]
pub struct LimitedCredential {
    remaining: AtomicUsize,
}

impl LimitedCredential {
    #[must_use]
    pub const fn new(tokens: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(tokens),
        }
    }
}

impl CredentialProvider for LimitedCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        let granted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if granted {
            Ok(AccessToken::new(TEST_TOKEN, None))
        } else {
            Err(CapacityError::AuthFailed {
                reason: "token no longer available".to_string(),
            })
        }
    }
}

// =============================================================================
// Temp Directory Utilities
// =============================================================================

/// A temporary directory for tests with automatic cleanup.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file in the temporary directory and return its path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
        path
    }

    /// Write `config.json` and return its path.
    pub fn write_config(&self, content: &str) -> PathBuf {
        self.create_file("config.json", content)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Check if a string contains ANSI escape sequences.
#[must_use]
pub fn has_ansi_codes(text: &str) -> bool {
    text.contains('\x1b')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::normalize;

    #[test]
    fn config_fixture_is_valid() {
        let config = make_test_config("http://127.0.0.1:9", &["gpt-4o", "o3"]);
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.request_settings.retry_delay, Duration::from_millis(10));
    }

    #[test]
    fn capacity_fixture_normalizes() {
        let doc = make_test_capacity_response(vec![make_test_capacity_entry(
            "gpt-4o",
            "eastus",
            "GlobalStandard",
            42,
        )]);
        let records = normalize(&doc);
        assert_eq!(records, vec![make_test_record("eastus", "GlobalStandard", 42)]);
    }

    #[tokio::test]
    async fn limited_credential_runs_out() {
        let cred = LimitedCredential::new(2);
        assert!(cred.get_token("scope").await.is_ok());
        assert!(cred.get_token("scope").await.is_ok());
        assert!(cred.get_token("scope").await.is_err());
    }

    #[test]
    fn test_dir_writes_config() {
        let dir = TestDir::new();
        let path = dir.write_config("{}");
        assert!(path.exists());
        assert_contains!(fs::read_to_string(path).unwrap(), "{}");
    }
}
