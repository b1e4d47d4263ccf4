//! card-status-feed server entry point.
//!
//! Serves the `/ws/card-status` WebSocket feed and a health endpoint.
//! Snapshots come from polling `CARD_STATUS_URL`; without it the feed
//! publishes fallback snapshots.

use card_status_stream::app_state::FeedState;
use card_status_stream::config::{FeedConfig, LogFormat};
use card_status_stream::feed::{
    self, CardStatus, HttpStatusPoller, StatusBus, spawn_broadcaster,
};
use card_status_stream::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::from_env());

    let config = FeedConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting card-status-feed");

    let bus = StatusBus::new(config.bus_capacity);
    let broadcaster = match config.status_url.clone() {
        Some(url) => {
            tracing::info!(url = %url, "polling backend for card status");
            let poller = HttpStatusPoller::new(url, config.broadcast_interval)?;
            spawn_broadcaster(bus.clone(), poller, config.broadcast_interval)
        }
        None => {
            tracing::warn!("CARD_STATUS_URL not set; publishing fallback status");
            spawn_broadcaster(bus.clone(), CardStatus::fallback, config.broadcast_interval)
        }
    };

    let app = feed::build_router(FeedState::new(bus));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    broadcaster.abort();
    tracing::info!("card-status-feed stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
