//! The relay: `POST /api/chat`.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chatgate_models::ChatRequest;

use crate::error::ChatError;
use crate::state::AppState;

/// Validates the question, forwards it upstream and relays the answer body
/// back 1:1. The quota gate has already run by the time this handler sees
/// the request.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ChatError> {
    if request.query.trim().is_empty() {
        return Err(ChatError::InvalidInput(
            "No question was provided.".to_string(),
        ));
    }

    tracing::debug!(chars = request.query.len(), "forwarding question upstream");
    let upstream = state.upstream.ask(&request.query).await?;

    // Pull-based 1:1 relay: the body adapter requests the next upstream
    // chunk only once the outbound side has accepted the previous one, and
    // closes when upstream signals end-of-stream. A chunk error after this
    // point aborts the connection; the JSON envelope is no longer reachable.
    Ok((
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response())
}
