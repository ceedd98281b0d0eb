//! Wire and transcript types shared by the chatgate server and its clients.

use serde::{Deserialize, Serialize};

/// Author of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One entry in a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`.
///
/// `query` defaults to empty when the field is absent so a missing question
/// takes the same validation path as an empty one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
}

/// Uniform `{ "error": ... }` envelope carried by every non-streaming
/// failure response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Fresh per-request answer from the external quota counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaDecision {
    pub allowed: bool,
}
