//! Broadcast channel for status snapshots.
//!
//! [`StatusBus`] wraps a [`tokio::sync::broadcast`] channel and remembers
//! the last published snapshot, so a newly connected feed client can be
//! sent the current status before any new one is published.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::CardStatus;

/// Broadcast bus for [`CardStatus`] snapshots.
///
/// When the ring buffer is full, the oldest snapshots are dropped for
/// lagging receivers.
#[derive(Debug, Clone)]
pub struct StatusBus {
    sender: broadcast::Sender<CardStatus>,
    last: Arc<RwLock<CardStatus>>,
}

impl StatusBus {
    /// Creates a new `StatusBus` with the given channel capacity. The last
    /// known status starts as [`CardStatus::unknown`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            last: Arc::new(RwLock::new(CardStatus::unknown())),
        }
    }

    /// Records `status` as the last known status and sends it to every
    /// subscriber.
    ///
    /// Returns the number of receivers that got it; zero when nobody is
    /// subscribed.
    pub fn publish(&self, status: CardStatus) -> usize {
        let mut last = self.last.write();
        *last = status.clone();
        self.sender.send(status).unwrap_or(0)
    }

    /// Subscribes to future snapshots and returns the current one.
    ///
    /// Both are taken under the same lock, so no snapshot is lost or
    /// duplicated between them.
    #[must_use]
    pub fn subscribe(&self) -> (CardStatus, broadcast::Receiver<CardStatus>) {
        let last = self.last.read();
        (last.clone(), self.sender.subscribe())
    }

    /// Last published snapshot.
    #[must_use]
    pub fn last_status(&self) -> CardStatus {
        self.last.read().clone()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = StatusBus::new(16);
        assert_eq!(bus.publish(CardStatus::ready("test")), 0);
    }

    #[test]
    fn publish_updates_last_status_even_without_receivers() {
        let bus = StatusBus::new(16);
        assert_eq!(bus.last_status().status, "unknown");
        bus.publish(CardStatus::ready("test"));
        assert_eq!(bus.last_status().status, "ready");
    }

    #[tokio::test]
    async fn subscriber_gets_current_then_future() {
        let bus = StatusBus::new(16);
        bus.publish(CardStatus::ready("first"));

        let (current, mut rx) = bus.subscribe();
        assert_eq!(current.source.as_deref(), Some("first"));

        bus.publish(CardStatus::error("reader gone", "second"));
        let Ok(next) = rx.recv().await else {
            panic!("expected a snapshot");
        };
        assert!(next.is_error());
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_snapshot() {
        let bus = StatusBus::new(16);
        let (_, mut rx1) = bus.subscribe();
        let (_, mut rx2) = bus.subscribe();

        assert_eq!(bus.publish(CardStatus::ready("fanout")), 2);

        let Ok(s1) = rx1.recv().await else {
            panic!("rx1 failed");
        };
        let Ok(s2) = rx2.recv().await else {
            panic!("rx2 failed");
        };
        assert_eq!(s1, s2);
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = StatusBus::new(16);
        assert_eq!(bus.receiver_count(), 0);

        let (_, rx1) = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);

        let (_, _rx2) = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }
}
