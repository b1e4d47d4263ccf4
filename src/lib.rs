//! # card-status-stream
//!
//! Realtime card/reader status for a smart-card management backend.
//!
//! The core is [`stream::StatusStreamClient`]: one WebSocket subscription
//! to the backend's `/ws/card-status` feed, automatic reconnection with a
//! bounded retry budget and fixed delay, and fan-out of each status
//! snapshot to registered listeners. The [`feed`] module is the server
//! half of the same feed.
//!
//! ## Architecture
//!
//! ```text
//! Owner (UI, CLI)
//!     │  connect / disconnect / set_visibility
//!     ├── StatusStreamClient (stream/)
//!     │       ├── ReconnectMachine   (state, retry budget, generations)
//!     │       ├── socket task        (tokio-tungstenite)
//!     │       └── ListenerRegistry × 2 (status, connection)
//!     │
//!     │  ws://host/ws/card-status
//!     │
//!     └── Feed server (feed/)
//!             ├── WS handler + per-client loop (axum)
//!             ├── StatusBus (broadcast + last status)
//!             └── Broadcaster (periodic snapshots)
//! ```

pub mod app_state;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod stream;

pub use config::StreamConfig;
pub use error::StreamError;
pub use stream::{StatusStreamClient, Visibility, listener};
