//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::FeedState;

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    feed_clients: usize,
}

/// `GET /health`: service health status.
pub async fn health_handler(State(state): State<FeedState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            feed_clients: state.bus.receiver_count(),
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<FeedState> {
    Router::new().route("/health", get(health_handler))
}
