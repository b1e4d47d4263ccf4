//! Per-client feed loop.
//!
//! Sends the current snapshot on connect, then forwards every published
//! snapshot until the client goes away. The feed is push-only; anything the
//! client sends is read only to notice a close.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::CardStatus;

/// Runs the write/read loop for a single feed connection.
pub async fn run_connection(
    socket: WebSocket,
    initial: CardStatus,
    mut status_rx: broadcast::Receiver<CardStatus>,
    connection_id: Uuid,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    if send_status(&mut ws_tx, &initial).await.is_err() {
        tracing::debug!(%connection_id, "feed client left before first snapshot");
        return;
    }

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(Message::Text(text))) => {
                        tracing::trace!(%connection_id, len = text.as_str().len(), "ignoring client message");
                    }
                    _ => {}
                }
            }
            status = status_rx.recv() => {
                match status {
                    Ok(status) => {
                        if send_status(&mut ws_tx, &status).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(%connection_id, lagged = n, "feed client lagged behind status bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!(%connection_id, "feed connection closed");
}

async fn send_status(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    status: &CardStatus,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(status) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode status snapshot");
            return Ok(());
        }
    };
    ws_tx.send(Message::text(json)).await
}
