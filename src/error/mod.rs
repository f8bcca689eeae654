//! Error types for azcap.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! - **Configuration**: missing or invalid configuration. Fatal, surfaced
//!   before any query runs.
//! - **Authentication**: no usable credential, or the endpoint rejected the
//!   token (401/403). Terminal for a query, never retried.
//! - **Request**: non-2xx response after exhausting retries.
//! - **Transport**: timeout or connection failure after exhausting retries.
//! - **Internal**: I/O, serialization, and unclassified errors.
//!
//! Failures inside a single model query are caught by the query pipeline and
//! reported alongside the results; only configuration and credential-setup
//! failures reach `main` unmodified.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential or token problems.
    Authentication,
    /// Timeouts and connection failures.
    Network,
    /// Configuration parse or validation failures.
    Configuration,
    /// The capacity endpoint answered with an error or an unreadable body.
    Provider,
    /// Bugs, I/O, unexpected state.
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Configuration => "Configuration error",
            Self::Provider => "Provider error",
            Self::Internal => "Internal error",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// No usable credential, or the endpoint rejected it
    AuthError = 2,
    /// Configuration or response parse errors
    ParseError = 3,
    /// Timeout or connection failure
    Timeout = 4,
    /// Some models failed, others succeeded
    PartialFailure = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Everything that can go wrong while loading and validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No configuration file at the resolved path.
    #[error("configuration file not found: {path}")]
    NotFound { path: String },

    /// The file exists but is not valid JSON/TOML for the expected shape.
    #[error("invalid configuration in {path}: {message}")]
    Parse { path: String, message: String },

    /// A top-level section (`azure`, `models`, `request_settings`) is absent.
    #[error("missing required configuration section: {0}")]
    MissingSection(String),

    /// A required field is absent or empty.
    #[error("missing or empty configuration field: {0}")]
    MissingField(String),

    /// A field is present but its value is out of range or malformed.
    #[error("invalid configuration value for '{key}': {message}")]
    Invalid { key: String, message: String },

    /// A model name was requested that the configuration does not define.
    #[error("model '{0}' not found in configuration")]
    UnknownModel(String),
}

// =============================================================================
// Main Error Type
// =============================================================================

/// Main error type for azcap operations.
#[derive(Error, Debug)]
pub enum CapacityError {
    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigurationError),

    /// No usable credential source, or the token could not be obtained.
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    /// The endpoint answered with a non-success status.
    #[error("request failed with HTTP {status} after {attempts} attempt(s)")]
    RequestFailed { status: u16, attempts: u32 },

    /// Timeout or connection failure on every attempt.
    #[error("transport failure after {attempts} attempt(s): {cause}")]
    TransportFailed { cause: String, attempts: u32 },

    /// Failed to parse the endpoint's response body.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    /// Some models succeeded, some failed.
    #[error("partial failure: {failed} model(s) failed")]
    PartialFailure { failed: usize },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CapacityError {
    /// Map error to process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) | Self::ParseResponse(_) => ExitCode::ParseError,
            Self::AuthFailed { .. } => ExitCode::AuthError,
            Self::RequestFailed { status, .. } if *status == 401 || *status == 403 => {
                ExitCode::AuthError
            }
            Self::TransportFailed { .. } => ExitCode::Timeout,
            Self::PartialFailure { .. } => ExitCode::PartialFailure,
            Self::RequestFailed { .. } | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                ExitCode::GeneralError
            }
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::AuthFailed { .. } => ErrorCategory::Authentication,
            Self::RequestFailed { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Authentication
            }
            Self::TransportFailed { .. } => ErrorCategory::Network,
            Self::RequestFailed { .. } | Self::ParseResponse(_) | Self::PartialFailure { .. } => {
                ErrorCategory::Provider
            }
            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `AZCAP-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config(inner) => match inner {
                ConfigurationError::NotFound { .. } => "AZCAP-C001",
                ConfigurationError::Parse { .. } => "AZCAP-C002",
                ConfigurationError::MissingSection(_) => "AZCAP-C003",
                ConfigurationError::MissingField(_) => "AZCAP-C004",
                ConfigurationError::Invalid { .. } => "AZCAP-C005",
                ConfigurationError::UnknownModel(_) => "AZCAP-C006",
            },
            Self::AuthFailed { .. } => "AZCAP-A001",
            Self::RequestFailed { .. } => "AZCAP-P001",
            Self::ParseResponse(_) => "AZCAP-P002",
            Self::PartialFailure { .. } => "AZCAP-P003",
            Self::TransportFailed { .. } => "AZCAP-N001",
            Self::Io(_) => "AZCAP-X001",
            Self::Json(_) => "AZCAP-X002",
            Self::Other(_) => "AZCAP-X099",
        }
    }

    /// Number of HTTP attempts made before this error was raised, if any.
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::RequestFailed { attempts, .. } | Self::TransportFailed { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }

    /// A one-line hint for the user, when there is something actionable.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self.category() {
            ErrorCategory::Authentication => Some(
                "Run `az login`, or export AZURE_ACCESS_TOKEN with a management-plane token."
                    .to_string(),
            ),
            ErrorCategory::Configuration => Some(
                "Check your config file (see `azcap config check`) and fill in the required fields."
                    .to_string(),
            ),
            ErrorCategory::Network => Some(
                "Check connectivity to the management endpoint, or raise request_settings.timeout."
                    .to_string(),
            ),
            ErrorCategory::Provider | ErrorCategory::Internal => None,
        }
    }
}

/// Result type alias for azcap operations.
pub type Result<T> = std::result::Result<T, CapacityError>;
