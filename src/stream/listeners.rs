//! Ordered listener registries with snapshot notification.
//!
//! A [`ListenerRegistry`] keeps callbacks in insertion order and does not
//! deduplicate them. Notification works on a copy of the registry taken
//! before the pass, with the lock released, so a listener may add or
//! remove listeners (or drive the client) while it is being called.
//! Changes made during a pass take effect from the next pass on.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared callback reference.
///
/// Identity is the `Arc` allocation: clone the `Arc` to keep a handle for
/// later removal.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Wraps a closure into a [`Listener`].
pub fn listener<T, F>(f: F) -> Listener<T>
where
    F: Fn(&T) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Insertion-ordered set of listeners for one kind of notification.
pub struct ListenerRegistry<T> {
    kind: &'static str,
    listeners: Mutex<Vec<Listener<T>>>,
}

impl<T> fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

impl<T> ListenerRegistry<T> {
    /// Creates an empty registry. `kind` labels log lines.
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Appends a listener. Registering the same listener twice makes it
    /// run twice per notification.
    pub fn add(&self, listener: Listener<T>) {
        self.listeners.lock().push(listener);
    }

    /// Removes every registration of `listener`. Returns how many were
    /// removed; zero when it was never registered.
    pub fn remove(&self, listener: &Listener<T>) -> usize {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        before.saturating_sub(listeners.len())
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Copy of the current registrations in notification order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Listener<T>> {
        self.listeners.lock().iter().map(Arc::clone).collect()
    }

    /// Calls every listener registered at the start of the pass, in order.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    /// Returns the number of listeners that completed without panicking.
    pub fn notify(&self, value: &T) -> usize {
        let snapshot = self.snapshot();
        let mut completed = 0_usize;
        for (index, listener) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| listener(value))) {
                Ok(()) => completed = completed.saturating_add(1),
                Err(payload) => {
                    tracing::error!(
                        registry = self.kind,
                        index,
                        panic = panic_message(payload.as_ref()),
                        "listener panicked"
                    );
                }
            }
        }
        completed
    }
}

fn same_listener<T>(a: &Listener<T>, b: &Listener<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Listener<u32> {
        let log = Arc::clone(log);
        listener(move |v: &u32| log.lock().push(format!("{name}:{v}")))
    }

    #[test]
    fn notifies_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new("status");
        registry.add(recorder(&log, "a"));
        registry.add(recorder(&log, "b"));
        registry.add(recorder(&log, "c"));

        assert_eq!(registry.notify(&7), 3);
        assert_eq!(*log.lock(), vec!["a:7", "b:7", "c:7"]);
    }

    #[test]
    fn duplicate_registration_runs_twice() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new("status");
        let a = recorder(&log, "a");
        registry.add(Arc::clone(&a));
        registry.add(Arc::clone(&a));

        registry.notify(&1);
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn remove_drops_every_registration() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new("status");
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");
        registry.add(Arc::clone(&a));
        registry.add(Arc::clone(&b));
        registry.add(Arc::clone(&a));

        assert_eq!(registry.remove(&a), 2);
        registry.notify(&3);
        assert_eq!(*log.lock(), vec!["b:3"]);
    }

    #[test]
    fn removing_unknown_listener_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new("status");
        registry.add(recorder(&log, "a"));

        let stranger = recorder(&log, "a");
        assert_eq!(registry.remove(&stranger), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_siblings() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new("status");
        registry.add(recorder(&log, "before"));
        registry.add(listener(|_: &u32| panic!("boom")));
        registry.add(recorder(&log, "after"));

        assert_eq!(registry.notify(&9), 2);
        assert_eq!(*log.lock(), vec!["before:9", "after:9"]);
    }

    #[test]
    fn mutation_during_notify_applies_to_next_pass() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Arc::new(ListenerRegistry::new("status"));
        let late = recorder(&log, "late");

        let adder = {
            let registry = Arc::clone(&registry);
            let late = Arc::clone(&late);
            listener(move |_: &u32| registry.add(Arc::clone(&late)))
        };
        registry.add(Arc::clone(&adder));
        registry.add(recorder(&log, "steady"));

        registry.notify(&1);
        assert_eq!(*log.lock(), vec!["steady:1"]);

        registry.remove(&adder);
        registry.notify(&2);
        assert_eq!(*log.lock(), vec!["steady:1", "steady:2", "late:2"]);
    }

    #[test]
    fn listener_can_remove_itself_mid_pass() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Arc::new(ListenerRegistry::new("connection"));
        let slot: Arc<Mutex<Option<Listener<u32>>>> = Arc::new(Mutex::new(None));

        let once = {
            let registry = Arc::clone(&registry);
            let slot = Arc::clone(&slot);
            let log = Arc::clone(&log);
            listener(move |v: &u32| {
                log.lock().push(format!("once:{v}"));
                if let Some(me) = slot.lock().as_ref() {
                    registry.remove(me);
                }
            })
        };
        *slot.lock() = Some(Arc::clone(&once));
        registry.add(once);
        registry.add(recorder(&log, "b"));

        registry.notify(&1);
        registry.notify(&2);
        assert_eq!(*log.lock(), vec!["once:1", "b:1", "b:2"]);
    }
}
