//! Failure taxonomy for the chat route.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong before streaming begins.
///
/// Each variant maps to one status code and the uniform `{ "error": ... }`
/// envelope. Once bytes are flowing the envelope is no longer reachable;
/// a mid-stream failure aborts the connection instead.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Inference backend error: {0}")]
    Upstream(String),

    #[error("Quota service error: {0}")]
    QuotaStore(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] reqwest::Error),
}

impl ChatError {
    fn status(&self) -> StatusCode {
        match self {
            ChatError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            ChatError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ChatError::Upstream(_) | ChatError::QuotaStore(_) | ChatError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
