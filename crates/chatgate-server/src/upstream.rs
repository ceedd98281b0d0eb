//! Client for the configured inference backend.

use reqwest::{Client, Response};
use serde_json::json;

use crate::error::ChatError;

/// Issues the single upstream POST a chat turn needs and hands back the raw
/// streaming response.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Forwards one question. A non-2xx status drains the whole body as text
    /// into [`ChatError::Upstream`]; only successful responses are returned,
    /// body unread, so the caller can relay it chunk by chunk.
    pub async fn ask(&self, query: &str) -> Result<Response, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({ "query": query }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "inference backend rejected the question");
            return Err(ChatError::Upstream(text));
        }

        Ok(response)
    }
}
