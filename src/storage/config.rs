//! Configuration file loading and validation.
//!
//! The configuration document has three required sections:
//!
//! ```json
//! {
//!   "azure": {"subscription_id": "...", "api_version": "2024-10-01",
//!             "base_url": "https://management.azure.com"},
//!   "models": {"gpt-4o": {"model_format": "OpenAI", "model_name": "gpt-4o",
//!                         "model_version": "2024-05-13"}},
//!   "request_settings": {"timeout": 30, "retry_attempts": 3, "retry_delay": 1}
//! }
//! ```
//!
//! Files ending in `.toml` are read as TOML with the same shape.
//!
//! ## Path precedence
//!
//! 1. `--config` flag
//! 2. `AZCAP_CONFIG` environment variable
//! 3. `./config.json` if present
//! 4. `<platform config dir>/azcap/config.toml`
//!
//! ## Environment overrides
//!
//! - `AZURE_SUBSCRIPTION_ID`: replaces `azure.subscription_id`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::paths::{AppPaths, LOCAL_CONFIG_FILE};
use crate::core::http::RetryPolicy;
use crate::core::models::ModelQuerySpec;
use crate::error::ConfigurationError;

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "AZCAP_CONFIG";
/// Environment variable overriding `azure.subscription_id`.
pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const MAX_TIMEOUT_SECS: u64 = 300;

type ConfigResult<T> = std::result::Result<T, ConfigurationError>;

// =============================================================================
// Config Path Resolution
// =============================================================================

/// Where the config path came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` flag.
    Cli,
    /// `AZCAP_CONFIG`.
    Env,
    /// `./config.json`.
    WorkingDir,
    /// Platform config directory.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::WorkingDir => write!(f, "working directory"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Resolve which config file to load.
#[must_use]
pub fn resolve_config_path(cli_path: Option<&Path>) -> (PathBuf, ConfigSource) {
    if let Some(path) = cli_path {
        return (path.to_path_buf(), ConfigSource::Cli);
    }

    if let Some(path) = std::env::var(ENV_CONFIG)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    {
        return (PathBuf::from(path), ConfigSource::Env);
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return (local, ConfigSource::WorkingDir);
    }

    (AppPaths::new().config_file(), ConfigSource::Default)
}

// =============================================================================
// Raw File Shape
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    azure: Option<RawAzure>,
    models: Option<BTreeMap<String, RawModel>>,
    request_settings: Option<RawRequestSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAzure {
    subscription_id: Option<String>,
    api_version: Option<String>,
    base_url: Option<String>,
    subscription_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawModel {
    model_format: Option<String>,
    model_name: Option<String>,
    model_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRequestSettings {
    timeout: Option<u64>,
    retry_attempts: Option<u32>,
    retry_delay: Option<f64>,
    max_concurrency: Option<usize>,
}

fn required(value: Option<String>, key: &str) -> ConfigResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigurationError::MissingField(key.to_string()))
}

// =============================================================================
// Validated Configuration
// =============================================================================

/// Azure subscription and endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AzureSettings {
    pub subscription_id: String,
    pub api_version: String,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_name: Option<String>,
}

/// HTTP behaviour for capacity queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestSettings {
    /// Per-attempt timeout.
    pub timeout: Duration,
    pub retry_attempts: u32,
    /// Base backoff delay.
    pub retry_delay: Duration,
    /// Models queried at once.
    pub max_concurrency: usize,
}

impl RequestSettings {
    /// Retry policy derived from these settings.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, self.retry_delay, self.timeout)
    }
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::from_secs_f64(DEFAULT_RETRY_DELAY_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Fully validated configuration, populated once at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityConfig {
    pub azure: AzureSettings,
    /// Configured model key → query parameters.
    pub models: BTreeMap<String, ModelQuerySpec>,
    pub request_settings: RequestSettings,
}

impl CapacityConfig {
    /// Load and validate a config file, applying environment overrides.
    ///
    /// # Errors
    ///
    /// `NotFound` if the file is missing, `Parse` if it is not valid
    /// JSON/TOML, and the validation errors of [`Self::from_raw`].
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigurationError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path).map_err(|e| ConfigurationError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let mut config = if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
        .map_err(|e| match e {
            ConfigurationError::Parse { message, .. } => ConfigurationError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;

        config.apply_env_overrides();
        tracing::info!(?path, models = config.models.len(), "Configuration loaded");
        Ok(config)
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` on malformed or incomplete input.
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let raw: RawConfig = serde_json::from_str(content).map_err(|e| ConfigurationError::Parse {
            path: "<json>".to_string(),
            message: e.to_string(),
        })?;
        Self::from_raw(raw)
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` on malformed or incomplete input.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigurationError::Parse {
            path: "<toml>".to_string(),
            message: e.to_string(),
        })?;
        Self::from_raw(raw)
    }

    /// Validate the raw document.
    ///
    /// Checks that:
    /// - `azure`, `models` and `request_settings` sections exist
    /// - subscription, API version and base URL are non-empty; the base URL
    ///   is http(s)
    /// - every model has a format, name and version
    /// - timeout is 1-300 seconds, retry attempts and concurrency are >= 1,
    ///   retry delay is a non-negative number
    fn from_raw(raw: RawConfig) -> ConfigResult<Self> {
        let azure = raw
            .azure
            .ok_or_else(|| ConfigurationError::MissingSection("azure".to_string()))?;
        let models = raw
            .models
            .ok_or_else(|| ConfigurationError::MissingSection("models".to_string()))?;
        let settings = raw
            .request_settings
            .ok_or_else(|| ConfigurationError::MissingSection("request_settings".to_string()))?;

        let base_url = required(azure.base_url, "azure.base_url")?;
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ConfigurationError::Invalid {
                key: "azure.base_url".to_string(),
                message: format!("'{base_url}' is not an http(s) URL"),
            });
        }

        let azure = AzureSettings {
            subscription_id: required(azure.subscription_id, "azure.subscription_id")?,
            api_version: required(azure.api_version, "azure.api_version")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            subscription_name: azure.subscription_name.filter(|n| !n.trim().is_empty()),
        };

        let models = models
            .into_iter()
            .map(|(key, m)| {
                let spec = ModelQuerySpec {
                    model_format: required(m.model_format, &format!("models.{key}.model_format"))?,
                    model_name: required(m.model_name, &format!("models.{key}.model_name"))?,
                    model_version: required(
                        m.model_version,
                        &format!("models.{key}.model_version"),
                    )?,
                };
                Ok((key, spec))
            })
            .collect::<ConfigResult<BTreeMap<_, _>>>()?;
        if models.is_empty() {
            tracing::warn!("No models configured; queries will return nothing");
        }

        let request_settings = Self::validate_settings(&settings)?;

        Ok(Self {
            azure,
            models,
            request_settings,
        })
    }

    fn validate_settings(raw: &RawRequestSettings) -> ConfigResult<RequestSettings> {
        let invalid = |key: &str, message: &str| ConfigurationError::Invalid {
            key: format!("request_settings.{key}"),
            message: message.to_string(),
        };

        let timeout = raw.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout == 0 || timeout > MAX_TIMEOUT_SECS {
            return Err(invalid("timeout", "must be between 1 and 300 seconds"));
        }

        let retry_attempts = raw.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS);
        if retry_attempts == 0 {
            return Err(invalid("retry_attempts", "must be at least 1"));
        }

        let retry_delay = raw.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY_SECS);
        if !retry_delay.is_finite() || retry_delay < 0.0 {
            return Err(invalid("retry_delay", "must be a non-negative number of seconds"));
        }

        let max_concurrency = raw.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY);
        if max_concurrency == 0 {
            return Err(invalid("max_concurrency", "must be at least 1"));
        }

        Ok(RequestSettings {
            timeout: Duration::from_secs(timeout),
            retry_attempts,
            retry_delay: Duration::from_secs_f64(retry_delay),
            max_concurrency,
        })
    }

    /// Apply `AZURE_SUBSCRIPTION_ID` if set.
    pub fn apply_env_overrides(&mut self) {
        if let Some(sub) = std::env::var(ENV_SUBSCRIPTION_ID)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            tracing::debug!("Subscription overridden from environment");
            self.azure.subscription_id = sub;
        }
    }

    /// Look up a configured model by key.
    ///
    /// # Errors
    ///
    /// `UnknownModel` if the key is not configured.
    pub fn model(&self, name: &str) -> ConfigResult<&ModelQuerySpec> {
        self.models
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownModel(name.to_string()))
    }

    /// Capacity endpoint for the configured subscription.
    #[must_use]
    pub fn capacity_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/providers/Microsoft.CognitiveServices/modelCapacities",
            self.azure.base_url, self.azure.subscription_id
        )
    }
}
