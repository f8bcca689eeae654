//! Credential providers for the management API.
//!
//! The query pipeline only depends on [`CredentialProvider`]. Token
//! discovery lives here: an environment-variable token, the Azure CLI, and a
//! [`DefaultCredential`] that tries them in that order.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{CapacityError, Result};

/// Scope for Azure Resource Manager tokens.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Environment variable holding a pre-acquired bearer token.
pub const ENV_ACCESS_TOKEN: &str = "AZURE_ACCESS_TOKEN";
/// Optional RFC 3339 expiry for [`ENV_ACCESS_TOKEN`].
pub const ENV_ACCESS_TOKEN_EXPIRES_ON: &str = "AZURE_ACCESS_TOKEN_EXPIRES_ON";

/// Timeout for `az account get-access-token`.
pub const AZ_CLI_TIMEOUT: Duration = Duration::from_secs(30);

/// A bearer token and its expiry, when known.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>, expires_on: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// Whether the token is known to have expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_on.is_some_and(|exp| exp <= now)
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of bearer tokens.
///
/// Implementations may cache, but callers ask for a token before every
/// request and must not assume they do.
pub trait CredentialProvider: Send + Sync {
    /// Obtain a token for `scope`.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailed` if no usable credential is available.
    fn get_token(&self, scope: &str) -> impl Future<Output = Result<AccessToken>> + Send;
}

fn auth_failed(reason: impl Into<String>) -> CapacityError {
    CapacityError::AuthFailed {
        reason: reason.into(),
    }
}

// =============================================================================
// Static
// =============================================================================

/// Always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    token: AccessToken,
}

impl StaticCredential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, None),
        }
    }
}

impl CredentialProvider for StaticCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        if self.token.token.is_empty() {
            return Err(auth_failed("static token is empty"));
        }
        Ok(self.token.clone())
    }
}

// =============================================================================
// Environment
// =============================================================================

/// Reads `AZURE_ACCESS_TOKEN` at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredential;

impl CredentialProvider for EnvCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        let token = std::env::var(ENV_ACCESS_TOKEN)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| auth_failed(format!("{ENV_ACCESS_TOKEN} is not set")))?;

        let expires_on = std::env::var(ENV_ACCESS_TOKEN_EXPIRES_ON)
            .ok()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let token = AccessToken::new(token, expires_on);
        if token.is_expired_at(Utc::now()) {
            return Err(auth_failed(format!("{ENV_ACCESS_TOKEN} has expired")));
        }
        Ok(token)
    }
}

// =============================================================================
// Azure CLI
// =============================================================================

/// Local-time format of `expiresOn`, e.g. `2030-01-01 00:00:00.000000`.
const AZ_LOCAL_EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzTokenResponse {
    access_token: String,
    /// POSIX timestamp; newer CLI versions only.
    #[serde(default, rename = "expires_on")]
    expires_on_unix: Option<i64>,
    /// Local wall-clock time without an offset; emitted by every version.
    #[serde(default)]
    expires_on: Option<String>,
}

impl AzTokenResponse {
    fn expiry(&self) -> Option<DateTime<Utc>> {
        if let Some(secs) = self.expires_on_unix {
            return Utc.timestamp_opt(secs, 0).single();
        }
        let raw = self.expires_on.as_deref()?.trim();
        let naive = NaiveDateTime::parse_from_str(raw, AZ_LOCAL_EXPIRY_FORMAT).ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Asks the Azure CLI (`az account get-access-token`) for a token.
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: String,
    timeout: Duration,
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self {
            program: "az".to_string(),
            timeout: AZ_CLI_TIMEOUT,
        }
    }
}

impl AzureCliCredential {
    /// Use a specific `az` executable.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Run the CLI and return stdout, reading both pipes concurrently.
    ///
    /// The program is resolved on `PATH` first so wrappers such as `az.cmd`
    /// are found on Windows.
    async fn run(&self, args: &[&str]) -> Result<String> {
        let program = which::which(&self.program)
            .map_err(|_| auth_failed(format!("Azure CLI '{}' not found", self.program)))?;

        let mut child = Command::new(&program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| auth_failed(format!("failed to start Azure CLI: {e}")))?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let result = timeout(self.timeout, async {
            let stdout = async {
                let mut buf = String::new();
                if let Some(mut out) = stdout_pipe {
                    out.read_to_string(&mut buf).await?;
                }
                Ok::<_, std::io::Error>(buf)
            };
            let stderr = async {
                let mut buf = String::new();
                if let Some(mut err) = stderr_pipe {
                    err.read_to_string(&mut buf).await?;
                }
                Ok::<_, std::io::Error>(buf)
            };
            let (stdout, stderr) = tokio::join!(stdout, stderr);
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, stdout?, stderr?))
        })
        .await;

        match result {
            Ok(Ok((status, stdout, _))) if status.success() => Ok(stdout),
            Ok(Ok((status, _, stderr))) => Err(auth_failed(format!(
                "Azure CLI exited with {}: {}",
                status.code().unwrap_or(-1),
                stderr.trim()
            ))),
            Ok(Err(e)) => Err(auth_failed(format!("Azure CLI I/O error: {e}"))),
            Err(_) => Err(auth_failed(format!(
                "Azure CLI timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

fn parse_az_output(stdout: &str) -> Result<AccessToken> {
    let parsed: AzTokenResponse = serde_json::from_str(stdout)
        .map_err(|e| auth_failed(format!("unreadable Azure CLI output: {e}")))?;

    if parsed.access_token.is_empty() {
        return Err(auth_failed("Azure CLI returned an empty token"));
    }

    let expires_on = parsed.expiry();
    Ok(AccessToken::new(parsed.access_token, expires_on))
}

impl CredentialProvider for AzureCliCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        tracing::debug!(program = %self.program, scope, "Requesting token from Azure CLI");
        let stdout = self
            .run(&["account", "get-access-token", "--scope", scope, "--output", "json"])
            .await?;
        parse_az_output(&stdout)
    }
}

// =============================================================================
// Default chain
// =============================================================================

/// Tries [`EnvCredential`] and then [`AzureCliCredential`].
#[derive(Debug, Clone, Default)]
pub struct DefaultCredential {
    env: EnvCredential,
    cli: AzureCliCredential,
}

impl CredentialProvider for DefaultCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let env_err = match self.env.get_token(scope).await {
            Ok(token) => return Ok(token),
            Err(e) => e,
        };
        tracing::debug!(error = %env_err, "Environment credential unavailable, trying Azure CLI");

        match self.cli.get_token(scope).await {
            Ok(token) => Ok(token),
            Err(cli_err) => Err(auth_failed(format!(
                "no usable credential source ({env_err}; {cli_err})"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_output_with_unix_expiry() {
        let out = r#"{"accessToken":"abc","expiresOn":"2030-01-01 00:00:00.000000","expires_on":1893456000,"tokenType":"Bearer"}"#;
        let token = parse_az_output(out).unwrap();
        assert_eq!(token.token, "abc");
        assert_eq!(token.expires_on.unwrap().timestamp(), 1_893_456_000);
    }

    #[test]
    fn parses_cli_output_without_expiry() {
        let token = parse_az_output(r#"{"accessToken":"abc"}"#).unwrap();
        assert!(token.expires_on.is_none());
    }

    #[test]
    fn rejects_garbage_cli_output() {
        let err = parse_az_output("ERROR: Please run 'az login'").unwrap_err();
        assert!(matches!(err, CapacityError::AuthFailed { .. }));
        let err = parse_az_output(r#"{"accessToken":""}"#).unwrap_err();
        assert!(matches!(err, CapacityError::AuthFailed { .. }));
    }

    #[test]
    fn debug_redacts_token() {
        let token = AccessToken::new("secret-value", None);
        let text = format!("{token:?}");
        assert!(!text.contains("secret-value"));
        assert_eq!(token.bearer(), "Bearer secret-value");
    }

    #[test]
    fn expiry_check() {
        let past = Utc.timestamp_opt(0, 0).single();
        assert!(AccessToken::new("t", past).is_expired_at(Utc::now()));
        assert!(!AccessToken::new("t", None).is_expired_at(Utc::now()));
    }

    #[tokio::test]
    async fn static_credential_returns_token() {
        let token = StaticCredential::new("tok").get_token(MANAGEMENT_SCOPE).await.unwrap();
        assert_eq!(token.token, "tok");
        assert!(StaticCredential::new("").get_token(MANAGEMENT_SCOPE).await.is_err());
    }

    #[test]
    fn parses_cli_output_with_local_expiry_only() {
        let out = r#"{"accessToken":"abc","expiresOn":"2030-01-01 00:00:00.000000"}"#;
        let token = parse_az_output(out).unwrap();
        let expected = Local
            .with_ymd_and_hms(2030, 1, 1, 0, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(token.expires_on, Some(expected));
    }

    #[test]
    fn unreadable_local_expiry_is_ignored() {
        let token = parse_az_output(r#"{"accessToken":"abc","expiresOn":"soon"}"#).unwrap();
        assert!(token.expires_on.is_none());
    }

    #[tokio::test]
    async fn missing_cli_is_auth_failure() {
        let cred = AzureCliCredential::with_program("definitely-not-az-cli-binary");
        let err = cred.get_token(MANAGEMENT_SCOPE).await.unwrap_err();
        assert!(matches!(
            err,
            CapacityError::AuthFailed { ref reason } if reason.contains("not found")
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cli_program_is_resolved_on_path() {
        // `false` ignores its arguments and exits 1, so reaching the exit status
        // means the program was found and spawned.
        let cred = AzureCliCredential::with_program("false");
        let err = cred.get_token(MANAGEMENT_SCOPE).await.unwrap_err();
        assert!(matches!(
            err,
            CapacityError::AuthFailed { ref reason } if reason.starts_with("Azure CLI exited with")
        ));
    }
}
