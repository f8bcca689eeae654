//! Capacity query pipeline.
//!
//! Orchestrates one query cycle: token, request, retry, normalize, for every
//! configured model, collecting per-model failures instead of aborting.

use std::time::Instant;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

use super::credential::{CredentialProvider, MANAGEMENT_SCOPE};
use super::http::{RetryPolicy, build_client, execute};
use super::models::{CapacityRecord, ModelQueryError, ModelQuerySpec, QueryReport, QueryState};
use super::normalize::normalize;
use crate::error::{CapacityError, Result};
use crate::storage::config::CapacityConfig;

/// Client for the model-capacity endpoint.
///
/// Owns the HTTP session for its lifetime; dropping the client releases it.
pub struct CapacityClient<C: CredentialProvider> {
    config: CapacityConfig,
    credential: C,
    http: Client,
    policy: RetryPolicy,
}

impl<C: CredentialProvider> std::fmt::Debug for CapacityClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapacityClient")
            .field("subscription_id", &self.config.azure.subscription_id)
            .field("models", &self.config.models.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<C: CredentialProvider> CapacityClient<C> {
    /// Create a client from validated configuration.
    ///
    /// Requests one token up front so a missing credential fails here rather
    /// than once per model. Queries still request their own tokens.
    ///
    /// # Errors
    ///
    /// Returns the provider's `AuthFailed` unchanged if no token can be
    /// obtained, or `TransportFailed` if the HTTP client cannot be built.
    pub async fn new(config: CapacityConfig, credential: C) -> Result<Self> {
        let policy = config.request_settings.retry_policy();
        let http = build_client(policy.timeout)?;

        let token = credential
            .get_token(MANAGEMENT_SCOPE)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Credential check failed"))?;
        tracing::debug!(expires_on = ?token.expires_on, "Credential verified");

        Ok(Self {
            config,
            credential,
            http,
            policy,
        })
    }

    /// The configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &CapacityConfig {
        &self.config
    }

    /// The credential provider tokens are requested from.
    #[must_use]
    pub const fn credential(&self) -> &C {
        &self.credential
    }

    /// Query one configured model.
    ///
    /// # Errors
    ///
    /// `UnknownModel` if `name` is not configured, otherwise whatever the
    /// credential provider or request executor reports.
    pub async fn query_model(&self, name: &str) -> Result<Vec<CapacityRecord>> {
        let spec = self.config.model(name)?;
        self.run_query(name, spec).await.map_err(|(_, e)| e)
    }

    /// Query every configured model with bounded concurrency.
    ///
    /// Every model appears in the report. Failed models map to an empty
    /// record list plus an entry in `errors`.
    pub async fn query_all(&self) -> QueryReport {
        let start = Instant::now();
        let limit = self.config.request_settings.max_concurrency.max(1);
        tracing::info!(
            models = self.config.models.len(),
            concurrency = limit,
            "Querying model capacity"
        );

        let outcomes: Vec<_> = stream::iter(self.config.models.iter())
            .map(|(name, spec)| async move { (name, self.run_query(name, spec).await) })
            .buffer_unordered(limit)
            .collect()
            .await;

        let mut report = QueryReport::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(records) => {
                    report.results.insert(name.clone(), records);
                }
                Err((state, error)) => {
                    report.errors.push(ModelQueryError {
                        model: name.clone(),
                        state,
                        message: error.to_string(),
                        attempts: error.attempts(),
                    });
                    report.results.insert(name.clone(), Vec::new());
                }
            }
        }
        report.errors.sort_by(|a, b| a.model.cmp(&b.model));

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        if report.has_errors() {
            tracing::warn!(
                failed = report.errors.len(),
                total = report.results.len(),
                duration_ms,
                "Some model queries failed"
            );
        } else {
            tracing::info!(
                records = report.record_count(),
                duration_ms,
                "All model queries succeeded"
            );
        }
        report
    }

    fn query_params<'a>(&'a self, spec: &'a ModelQuerySpec) -> [(&'a str, &'a str); 4] {
        [
            ("api-version", self.config.azure.api_version.as_str()),
            ("modelFormat", spec.model_format.as_str()),
            ("modelName", spec.model_name.as_str()),
            ("modelVersion", spec.model_version.as_str()),
        ]
    }

    /// Run one model through the state machine, returning the terminal
    /// state alongside any error.
    async fn run_query(
        &self,
        name: &str,
        spec: &ModelQuerySpec,
    ) -> std::result::Result<Vec<CapacityRecord>, (QueryState, CapacityError)> {
        let mut state = QueryState::Pending;
        tracing::debug!(model = name, ?state, "Query state");

        let token = match self.credential.get_token(MANAGEMENT_SCOPE).await {
            Ok(token) => token,
            Err(e) => {
                state = QueryState::AuthFailed;
                tracing::warn!(model = name, ?state, error = %e, "Could not obtain token");
                return Err((state, e));
            }
        };
        state = QueryState::TokenAcquired;
        tracing::debug!(model = name, ?state, "Query state");

        let headers = build_headers(&token.bearer()).map_err(|e| (QueryState::AuthFailed, e))?;
        let url = self.config.capacity_url();
        let params = self.query_params(spec);

        state = QueryState::Requesting;
        tracing::debug!(model = name, ?state, "Query state");

        match execute(&self.http, &url, &headers, &params, &self.policy).await {
            Ok(document) => {
                let records = normalize(&document);
                state = QueryState::Succeeded;
                tracing::info!(
                    model = name,
                    ?state,
                    records = records.len(),
                    "Model query complete"
                );
                Ok(records)
            }
            Err(e) => {
                state = terminal_state(&e);
                tracing::warn!(model = name, ?state, error = %e, "Model query failed");
                Err((state, e))
            }
        }
    }
}

/// Terminal state for a failed request.
fn terminal_state(error: &CapacityError) -> QueryState {
    match error {
        CapacityError::AuthFailed { .. } => QueryState::AuthFailed,
        CapacityError::RequestFailed { status, .. } if *status == 401 || *status == 403 => {
            QueryState::AuthFailed
        }
        _ => QueryState::Exhausted,
    }
}

fn build_headers(bearer: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(bearer).map_err(|_| CapacityError::AuthFailed {
        reason: "token contains characters not allowed in a header".to_string(),
    })?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}
