//! Card status feed server.
//!
//! Serves `GET /ws/card-status`: each client gets the last known status as
//! soon as it connects, then every snapshot published on the
//! [`StatusBus`]. A [`broadcaster`] publishes fresh snapshots on a timer
//! while anyone is listening, usually taken by an [`HttpStatusPoller`] from
//! the backend's status endpoint.

pub mod broadcaster;
pub mod bus;
pub mod connection;
pub mod handler;
pub mod poller;
pub mod status;
pub mod system;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use broadcaster::{StatusSource, spawn_broadcaster};
pub use bus::StatusBus;
pub use poller::HttpStatusPoller;
pub use status::{CardStatus, SOURCE_ERROR, SOURCE_FALLBACK, ServiceHealth};

use crate::app_state::FeedState;
use crate::stream::STATUS_FEED_PATH;

/// Builds the feed router: the WebSocket endpoint plus system routes.
pub fn build_router(state: FeedState) -> Router {
    Router::new()
        .route(STATUS_FEED_PATH, get(handler::ws_handler))
        .merge(system::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
