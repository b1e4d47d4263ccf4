//! card-status-watch: follows a card status feed and logs what it sees.
//!
//! Connects to the feed derived from `CARD_STATUS_ORIGIN`, logs every
//! status snapshot and connectivity change, and disconnects on Ctrl-C.
//! On Unix, `SIGUSR1` is treated as the host becoming visible again: it
//! reconnects immediately if the feed is down.

use card_status_stream::config::LogFormat;
use card_status_stream::logging::init_tracing;
use card_status_stream::{StatusStreamClient, StreamConfig, listener};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::from_env());

    let config = StreamConfig::from_env()?;
    let client: StatusStreamClient = StatusStreamClient::new(&config)?;
    tracing::info!(
        url = %client.endpoint(),
        max_reconnect_attempts = config.max_reconnect_attempts,
        "starting card-status-watch"
    );

    client
        .add_status_listener(listener(|status: &serde_json::Value| {
            tracing::info!(%status, "card status");
        }))
        .add_connection_listener(listener(|connected: &bool| {
            if *connected {
                tracing::info!("status feed online");
            } else {
                tracing::warn!("status feed offline");
            }
        }));

    client.connect();
    wait_for_exit(&client).await?;
    client.disconnect();

    tracing::info!("card-status-watch stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_exit(client: &StatusStreamClient) -> anyhow::Result<()> {
    use card_status_stream::Visibility;
    use tokio::signal::unix::{SignalKind, signal};

    let mut resumed = signal(SignalKind::user_defined1())?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => return Ok(result?),
            _ = resumed.recv() => client.set_visibility(Visibility::Visible),
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_exit(_client: &StatusStreamClient) -> anyhow::Result<()> {
    Ok(tokio::signal::ctrl_c().await?)
}
