//! Shared state injected into the feed server's Axum handlers.

use crate::feed::StatusBus;

/// Feed server state available to all handlers via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct FeedState {
    /// Bus carrying status snapshots to feed connections.
    pub bus: StatusBus,
}

impl FeedState {
    /// Creates state around an existing bus.
    #[must_use]
    pub const fn new(bus: StatusBus) -> Self {
        Self { bus }
    }
}
