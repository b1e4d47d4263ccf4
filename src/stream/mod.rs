//! Reconnecting status stream client.
//!
//! Keeps one WebSocket subscription to the backend's card-status feed,
//! hides transient connectivity loss behind a bounded, fixed-delay
//! reconnect, and fans each status payload out to registered listeners.
//! Payloads are snapshots: nothing is buffered or replayed across an
//! outage.

mod connection;

pub mod client;
pub mod endpoint;
pub mod listeners;
pub mod machine;
pub mod state;

pub use client::StatusStreamClient;
pub use endpoint::{STATUS_FEED_PATH, ensure_transport, status_endpoint};
pub use listeners::{Listener, ListenerRegistry, listener};
pub use machine::{Action, Generation, ReconnectMachine};
pub use state::{CloseEvent, ConnectionState, RetryBudget, Visibility};
