//! HTTP client utilities and the retrying request executor.
//!
//! Every capacity query goes through [`execute`], which applies a bounded
//! exponential-backoff policy keyed by response status and transport outcome.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::Value;

use crate::error::{CapacityError, Result};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Statuses worth another attempt.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Build a configured HTTP client.
///
/// The client is the session for one query cycle: connection pooling lives
/// inside it and is released when it is dropped.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .user_agent(user_agent())
        .build()
        .map_err(|e| CapacityError::TransportFailed {
            cause: e.to_string(),
            attempts: 0,
        })
}

/// User-Agent sent with every request.
#[must_use]
pub fn user_agent() -> String {
    format!("azcap/{}", env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded exponential-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt.
    pub base_delay: Duration,
    /// Timeout applied to each individual attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` of 0 is treated as 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            timeout,
        }
    }

    /// Wait inserted after `prior_attempts` failed attempts (0-indexed):
    /// `base_delay × 2^n`.
    #[must_use]
    pub fn backoff_delay(&self, prior_attempts: u32) -> Duration {
        let factor = 2_u32.saturating_pow(prior_attempts);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), DEFAULT_TIMEOUT)
    }
}

// =============================================================================
// Attempt Outcome
// =============================================================================

/// Why a retryable attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryableFailure {
    /// Throttled or server-side error status.
    Status(u16),
    /// Timeout or connection-level error.
    Transport(String),
}

impl RetryableFailure {
    fn into_error(self, attempts: u32) -> CapacityError {
        match self {
            Self::Status(status) => CapacityError::RequestFailed { status, attempts },
            Self::Transport(cause) => CapacityError::TransportFailed { cause, attempts },
        }
    }
}

impl std::fmt::Display for RetryableFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Transport(cause) => write!(f, "{cause}"),
        }
    }
}

/// Result of a single request attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 2xx with a JSON body.
    Success(Value),
    /// Worth retrying if attempts remain.
    Retryable(RetryableFailure),
    /// Retrying cannot help.
    Terminal(CapacityError),
}

/// How a response status should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// 401/403: credential problem.
    Unauthorized,
    Retryable,
    Fatal,
}

/// Classify a response status.
#[must_use]
pub fn classify_status(status: StatusCode) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        StatusClass::Unauthorized
    } else if RETRYABLE_STATUSES.contains(&status.as_u16()) {
        StatusClass::Retryable
    } else {
        StatusClass::Fatal
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection error: {e}")
    } else {
        e.to_string()
    }
}

async fn attempt_once(
    client: &Client,
    url: &str,
    headers: &HeaderMap,
    query: &[(&str, &str)],
    timeout: Duration,
    attempt: u32,
) -> AttemptOutcome {
    let sent = client
        .get(url)
        .headers(headers.clone())
        .query(query)
        .timeout(timeout)
        .send()
        .await;

    let response = match sent {
        Ok(response) => response,
        Err(e) if e.is_builder() => {
            return AttemptOutcome::Terminal(CapacityError::TransportFailed {
                cause: e.to_string(),
                attempts: attempt,
            });
        }
        Err(e) => {
            return AttemptOutcome::Retryable(RetryableFailure::Transport(
                describe_transport_error(&e),
            ));
        }
    };

    let status = response.status();
    match classify_status(status) {
        StatusClass::Success => match response.json::<Value>().await {
            Ok(body) => AttemptOutcome::Success(body),
            Err(e) if e.is_timeout() => {
                AttemptOutcome::Retryable(RetryableFailure::Transport(describe_transport_error(&e)))
            }
            Err(e) => AttemptOutcome::Terminal(CapacityError::ParseResponse(e.to_string())),
        },
        StatusClass::Unauthorized => {
            tracing::error!(status = status.as_u16(), "Authentication/authorization error");
            AttemptOutcome::Terminal(CapacityError::RequestFailed {
                status: status.as_u16(),
                attempts: attempt,
            })
        }
        StatusClass::Retryable => {
            AttemptOutcome::Retryable(RetryableFailure::Status(status.as_u16()))
        }
        StatusClass::Fatal => {
            tracing::error!(status = status.as_u16(), "Unexpected response status");
            AttemptOutcome::Terminal(CapacityError::RequestFailed {
                status: status.as_u16(),
                attempts: attempt,
            })
        }
    }
}

/// Issue an authenticated GET, retrying transient failures with backoff.
///
/// At most `policy.max_attempts` requests are made. The backoff wait before
/// attempt n+1 is `policy.base_delay × 2^n` and suspends only this query.
///
/// # Errors
///
/// - `RequestFailed` immediately on 401/403 or any status that is neither
///   success nor retryable, and after the last attempt on 429/5xx.
/// - `TransportFailed` after the last attempt on timeout/connection errors.
/// - `ParseResponse` if a 2xx body is not JSON.
pub async fn execute(
    client: &Client,
    url: &str,
    headers: &HeaderMap,
    query: &[(&str, &str)],
    policy: &RetryPolicy,
) -> Result<Value> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        tracing::debug!(attempt, max_attempts, url, "Making request attempt");

        match attempt_once(client, url, headers, query, policy.timeout, attempt).await {
            AttemptOutcome::Success(body) => {
                tracing::debug!(attempt, "Request succeeded");
                return Ok(body);
            }
            AttemptOutcome::Terminal(err) => return Err(err),
            AttemptOutcome::Retryable(failure) => {
                if attempt >= max_attempts {
                    tracing::error!(
                        attempts = attempt,
                        reason = %failure,
                        "Request failed after all retry attempts"
                    );
                    return Err(failure.into_error(attempt));
                }

                let delay = policy.backoff_delay(attempt - 1);
                tracing::warn!(
                    attempt,
                    reason = %failure,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
