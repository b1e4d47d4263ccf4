//! Periodic status broadcaster.
//!
//! While at least one feed client is subscribed, asks a [`StatusSource`]
//! for a fresh snapshot every interval and publishes it. With no
//! subscribers the task keeps ticking but does no work.

use std::future::{Future, ready};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{CardStatus, StatusBus};

/// Producer of status snapshots.
///
/// Plain closures returning a [`CardStatus`] are sources too.
pub trait StatusSource: Send + Sync + 'static {
    /// Takes a snapshot of the current card/reader state.
    fn current_status(&self) -> impl Future<Output = CardStatus> + Send;
}

impl<F> StatusSource for F
where
    F: Fn() -> CardStatus + Send + Sync + 'static,
{
    fn current_status(&self) -> impl Future<Output = CardStatus> + Send {
        ready(self())
    }
}

/// Spawns the broadcast loop on the current runtime.
///
/// Abort the returned handle to stop it.
pub fn spawn_broadcaster<S: StatusSource>(
    bus: StatusBus,
    source: S,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if bus.receiver_count() == 0 {
                continue;
            }
            let status = source.current_status().await;
            let delivered = bus.publish(status);
            tracing::trace!(delivered, "status snapshot broadcast");
        }
    })
}
