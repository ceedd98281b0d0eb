//! The quota gate: per-identity request counting against an external store.
//!
//! The counting algorithm lives on the other side of the wire; this module
//! only derives the identity key, asks the counter, and turns a denial into
//! a 429 before the request body is ever touched.

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chatgate_models::QuotaDecision;
use serde_json::json;

use crate::error::ChatError;
use crate::state::AppState;

/// External per-identity counter.
///
/// Every call consumes one unit for `key` in the external store, whatever
/// happens to the request afterwards.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn consume(&self, key: &str) -> anyhow::Result<QuotaDecision>;
}

/// Counter client speaking to an HTTP quota service.
///
/// One POST per request: `{ key, limit, window_secs }` with a bearer token,
/// answered by `{ "allowed": bool }`.
pub struct RestQuotaStore {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    limit: u64,
    window_secs: u64,
}

impl RestQuotaStore {
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        limit: u64,
        window_secs: u64,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: token.into(),
            limit,
            window_secs,
        }
    }
}

#[async_trait]
impl QuotaStore for RestQuotaStore {
    async fn consume(&self, key: &str) -> anyhow::Result<QuotaDecision> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({
                "key": key,
                "limit": self.limit,
                "window_secs": self.window_secs,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("quota service returned an error: {text}");
        }

        Ok(response.json::<QuotaDecision>().await?)
    }
}

/// Rate-limit key for a request: first `x-forwarded-for` value, loopback
/// when absent. Direct traffic without the header shares one bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Middleware guarding the chat route. Runs before body extraction, so a
/// denied or invalid request still consumed its unit, exactly like the
/// counter-first ordering of the route it protects.
pub async fn quota_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_key(req.headers());

    match state.quota.consume(&key).await {
        Ok(QuotaDecision { allowed: true }) => next.run(req).await,
        Ok(QuotaDecision { allowed: false }) => {
            tracing::info!(key = %key, "quota exhausted");
            ChatError::QuotaExceeded(state.config.quota_exceeded_message.clone()).into_response()
        }
        // Fail closed: an unreachable counter must not expose the metered
        // upstream.
        Err(err) => {
            tracing::error!(error = %err, "quota service unavailable");
            ChatError::QuotaStore(err.to_string()).into_response()
        }
    }
}
