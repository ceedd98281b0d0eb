//! chatgate server: a quota-gated streaming relay in front of an inference
//! backend. One route does the work; everything else is wiring.

pub mod api;
pub mod config;
pub mod error;
pub mod quota;
pub mod state;
pub mod upstream;

pub use state::{AppState, ChatService};

use axum::http::{Method, header};
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;

#[derive(serde::Serialize)]
struct Health {
    status: String,
}

async fn health() -> axum::Json<Health> {
    axum::Json(Health {
        status: "chatgate is working!".to_string(),
    })
}

/// Builds the full router: health check plus the gated chat route.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let chat = Router::new()
        .route("/api/chat", post(api::chat::chat))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            quota::quota_gate,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(chat)
        .layer(cors)
        .with_state(state)
}
