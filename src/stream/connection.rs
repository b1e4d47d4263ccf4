//! Read loop for a single status-feed socket.
//!
//! One task per socket: it performs the handshake, forwards text frames,
//! and reports exactly one of open/close back to its owner. A shutdown
//! signal ends the task silently after sending a close frame.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::machine::Generation;
use super::state::{CLOSE_NO_STATUS, CloseEvent};
use crate::error::StreamError;

/// Receiver of socket lifecycle events.
pub(crate) trait SocketEvents: Send + Sync + 'static {
    /// Handshake completed.
    fn on_open(self: &Arc<Self>, generation: Generation);
    /// A text frame arrived.
    fn on_message(self: &Arc<Self>, generation: Generation, text: &str);
    /// The socket is gone, with or without a close handshake.
    fn on_close(self: &Arc<Self>, generation: Generation, close: CloseEvent);
}

/// Runs one socket to completion.
pub(crate) async fn run_socket<E: SocketEvents>(
    events: Arc<E>,
    url: Url,
    generation: Generation,
    mut shutdown: oneshot::Receiver<()>,
) {
    let connected = tokio::select! {
        _ = &mut shutdown => {
            tracing::debug!(generation, "connect attempt abandoned");
            return;
        }
        result = connect_async(url.as_str()) => result,
    };

    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::error!(generation, error = %StreamError::from(e), "status feed error");
            events.on_close(generation, CloseEvent::abnormal());
            return;
        }
    };

    tracing::info!(generation, url = %url, "status feed connection established");
    events.on_open(generation);

    let (mut ws_tx, mut ws_rx) = stream.split();
    let mut close_frame: Option<CloseEvent> = None;

    let close = loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(e) = ws_tx.send(Message::Close(None)).await {
                    tracing::debug!(generation, error = %e, "close frame not delivered");
                }
                tracing::debug!(generation, "status feed socket closed by client");
                return;
            }
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => events.on_message(generation, text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        close_frame = Some(frame.map_or_else(
                            || CloseEvent::new(CLOSE_NO_STATUS, ""),
                            |f| CloseEvent::new(u16::from(f.code), f.reason.as_str()),
                        ));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        if close_frame.is_none() {
                            tracing::error!(generation, error = %StreamError::from(e), "status feed error");
                        }
                        break close_frame.take().unwrap_or_else(CloseEvent::abnormal);
                    }
                    None => break close_frame.take().unwrap_or_else(CloseEvent::abnormal),
                }
            }
        }
    };

    if close.is_normal() {
        tracing::info!(generation, code = close.code, reason = %close.reason, "status feed closed");
    } else {
        tracing::warn!(generation, code = close.code, reason = %close.reason, "status feed closed");
    }
    events.on_close(generation, close);
}
