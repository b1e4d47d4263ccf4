//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::FeedState;

/// `GET /ws/card-status`: upgrade to the status feed.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<FeedState>) -> impl IntoResponse {
    let (initial, status_rx) = state.bus.subscribe();
    let connection_id = uuid::Uuid::new_v4();
    tracing::debug!(%connection_id, "feed client connecting");

    ws.on_upgrade(move |socket| run_connection(socket, initial, status_rx, connection_id))
}
