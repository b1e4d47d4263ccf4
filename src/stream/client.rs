//! Reconnecting status stream client.
//!
//! [`StatusStreamClient`] is a cheap, cloneable handle. Its owner decides
//! when to [`connect`](StatusStreamClient::connect) and
//! [`disconnect`](StatusStreamClient::disconnect); in between, the client
//! keeps one socket to the feed, fans payloads out to status listeners,
//! reports connectivity to connection listeners, and reconnects on close
//! while its retry budget lasts.
//!
//! All decisions go through a [`ReconnectMachine`]. Sockets and retry
//! timers are started and stopped under the same lock that guards the
//! machine, so they always follow the order in which the machine decided
//! them. Connection listeners run after that lock is released, so they are
//! free to call back into the client.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

use super::connection::{SocketEvents, run_socket};
use super::endpoint::{ensure_transport, status_endpoint};
use super::listeners::{Listener, ListenerRegistry};
use super::machine::{Action, Generation, ReconnectMachine};
use super::state::{CloseEvent, ConnectionState, Visibility};
use crate::config::StreamConfig;
use crate::error::StreamError;

/// Handle to a live socket task.
struct SocketHandle {
    generation: Generation,
    shutdown: oneshot::Sender<()>,
}

/// Armed retry timer.
struct RetryTimer {
    token: u64,
    task: JoinHandle<()>,
}

/// Machine plus the resources it controls.
struct Driver {
    machine: ReconnectMachine,
    socket: Option<SocketHandle>,
    retry: Option<RetryTimer>,
}

struct Shared<T> {
    endpoint: Url,
    runtime: Handle,
    driver: Mutex<Driver>,
    /// Held while connection listeners run; keeps notifications from
    /// different threads in the order the machine produced them.
    notify_gate: ReentrantMutex<()>,
    status_listeners: ListenerRegistry<T>,
    connection_listeners: ListenerRegistry<bool>,
    _payload: PhantomData<fn() -> T>,
}

/// Client for a server-pushed card status feed.
///
/// `T` is the payload type each text frame is deserialized into; the
/// default keeps payloads schema-agnostic.
///
/// # Example
///
/// ```ignore
/// let client: StatusStreamClient = StatusStreamClient::new(&StreamConfig::from_env()?)?;
/// client
///     .add_status_listener(listener(|status: &serde_json::Value| println!("{status}")))
///     .add_connection_listener(listener(|up: &bool| println!("connected: {up}")));
/// client.connect();
/// ```
pub struct StatusStreamClient<T = serde_json::Value> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for StatusStreamClient<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for StatusStreamClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let driver = self.shared.driver.lock();
        let machine = &driver.machine;
        f.debug_struct("StatusStreamClient")
            .field("endpoint", &self.shared.endpoint.as_str())
            .field("state", &machine.state())
            .field("reconnect_attempts", &machine.reconnect_attempts())
            .field("status_listeners", &self.shared.status_listeners.len())
            .field("connection_listeners", &self.shared.connection_listeners.len())
            .finish()
    }
}

impl<T> StatusStreamClient<T>
where
    T: DeserializeOwned + 'static,
{
    /// Builds a disconnected client.
    ///
    /// Must be called from within a tokio runtime; sockets and retry
    /// timers are spawned onto it.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidOrigin`] or
    /// [`StreamError::UnsupportedScheme`] if the configured origin has no
    /// WebSocket counterpart or needs TLS in a build without the `tls`
    /// feature, and [`StreamError::NoRuntime`] outside a tokio runtime.
    pub fn new(config: &StreamConfig) -> Result<Self, StreamError> {
        let endpoint = status_endpoint(&config.origin)?;
        ensure_transport(&endpoint)?;
        let runtime = Handle::try_current().map_err(|e| StreamError::NoRuntime(e.to_string()))?;

        Ok(Self {
            shared: Arc::new(Shared {
                endpoint,
                runtime,
                driver: Mutex::new(Driver {
                    machine: ReconnectMachine::new(
                        config.max_reconnect_attempts,
                        config.reconnect_interval,
                    ),
                    socket: None,
                    retry: None,
                }),
                notify_gate: ReentrantMutex::new(()),
                status_listeners: ListenerRegistry::new("status"),
                connection_listeners: ListenerRegistry::new("connection"),
                _payload: PhantomData,
            }),
        })
    }

    /// Tears down any existing connection and opens a new one.
    ///
    /// Returns immediately; the outcome arrives through connection
    /// listeners.
    pub fn connect(&self) {
        tracing::info!(url = %self.shared.endpoint, "connecting to status feed");
        self.shared.drive(|machine| machine.connect());
    }

    /// Closes the connection, if any, and cancels a pending reconnect.
    ///
    /// Listeners stay registered. Safe to call repeatedly.
    pub fn disconnect(&self) {
        self.shared.drive(|machine| {
            let actions = machine.disconnect();
            if !actions.is_empty() {
                tracing::info!("disconnecting from status feed");
            }
            actions
        });
    }

    /// Feeds the host's visibility into the client.
    ///
    /// Becoming visible while not connected reconnects right away,
    /// superseding any scheduled retry.
    pub fn set_visibility(&self, visibility: Visibility) {
        let endpoint = &self.shared.endpoint;
        self.shared.drive(|machine| {
            let actions = machine.visibility_changed(visibility);
            if !actions.is_empty() {
                tracing::info!(url = %endpoint, "visibility regained; reconnecting");
            }
            actions
        });
    }

    /// Registers a status listener. Returns `self` for chaining.
    pub fn add_status_listener(&self, listener: Listener<T>) -> &Self {
        self.shared.status_listeners.add(listener);
        self
    }

    /// Unregisters every registration of a status listener.
    pub fn remove_status_listener(&self, listener: &Listener<T>) -> &Self {
        self.shared.status_listeners.remove(listener);
        self
    }

    /// Registers a connection listener. Returns `self` for chaining.
    pub fn add_connection_listener(&self, listener: Listener<bool>) -> &Self {
        self.shared.connection_listeners.add(listener);
        self
    }

    /// Unregisters every registration of a connection listener.
    pub fn remove_connection_listener(&self, listener: &Listener<bool>) -> &Self {
        self.shared.connection_listeners.remove(listener);
        self
    }
}

impl<T> StatusStreamClient<T> {
    /// Feed URL derived from the configured origin.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.shared.endpoint
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.driver.lock().machine.state()
    }

    /// Returns `true` while the socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Automatic reconnects consumed since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.driver.lock().machine.reconnect_attempts()
    }

    /// Returns `true` while a reconnect is scheduled.
    #[must_use]
    pub fn retry_pending(&self) -> bool {
        self.shared.driver.lock().machine.retry_pending()
    }

    /// How the most recent socket closed, if any has.
    #[must_use]
    pub fn last_close(&self) -> Option<CloseEvent> {
        self.shared.driver.lock().machine.last_close().cloned()
    }
}

impl<T> Shared<T>
where
    T: DeserializeOwned + 'static,
{
    /// Feeds one input into the machine and carries out its actions.
    ///
    /// Socket and timer actions run under the driver lock, in order.
    /// Connection notifications run afterwards with only the notify gate
    /// held, which is reentrant so a listener can call back into the client.
    fn drive(self: &Arc<Self>, input: impl FnOnce(&mut ReconnectMachine) -> Vec<Action>) {
        self.drive_with(|driver| input(&mut driver.machine));
    }

    fn drive_with(self: &Arc<Self>, input: impl FnOnce(&mut Driver) -> Vec<Action>) {
        let _gate = self.notify_gate.lock();
        let notices = {
            let mut driver = self.driver.lock();
            let actions = input(&mut driver);
            self.execute(&mut driver, actions)
        };
        for connected in notices {
            self.connection_listeners.notify(&connected);
        }
    }

    /// Carries out machine actions in order and returns the connection
    /// notifications they requested.
    fn execute(self: &Arc<Self>, driver: &mut Driver, actions: Vec<Action>) -> Vec<bool> {
        let mut notices = Vec::new();
        for action in actions {
            match action {
                Action::Open { generation } => self.open_socket(driver, generation),
                Action::Close { generation } => {
                    let handle = driver.socket.take_if(|h| h.generation == generation);
                    if let Some(handle) = handle {
                        // Err means the task already finished.
                        let _ = handle.shutdown.send(());
                    }
                }
                Action::ScheduleRetry {
                    token,
                    attempt,
                    delay,
                } => {
                    tracing::info!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "reconnecting"
                    );
                    let shared = Arc::clone(self);
                    let task = self.runtime.spawn(async move {
                        tokio::time::sleep(delay).await;
                        shared.drive_with(|driver| {
                            if driver.retry.as_ref().is_some_and(|r| r.token == token) {
                                driver.retry = None;
                            }
                            driver.machine.retry_elapsed(token)
                        });
                    });
                    if let Some(previous) = driver.retry.replace(RetryTimer { token, task }) {
                        previous.task.abort();
                    }
                }
                Action::CancelRetry => {
                    if let Some(retry) = driver.retry.take() {
                        retry.task.abort();
                        tracing::debug!(token = retry.token, "pending reconnect cancelled");
                    }
                }
                Action::NotifyConnection(connected) => notices.push(connected),
                Action::GiveUp { attempts } => {
                    let last_close = driver.machine.last_close().map(ToString::to_string);
                    tracing::error!(
                        attempts,
                        last_close = last_close.as_deref().unwrap_or("none"),
                        "maximum reconnect attempts reached"
                    );
                }
            }
        }
        notices
    }

    fn open_socket(self: &Arc<Self>, driver: &mut Driver, generation: Generation) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let previous = driver.socket.replace(SocketHandle {
            generation,
            shutdown: shutdown_tx,
        });
        if let Some(previous) = previous {
            let _ = previous.shutdown.send(());
        }
        self.runtime.spawn(run_socket(
            Arc::clone(self),
            self.endpoint.clone(),
            generation,
            shutdown_rx,
        ));
    }
}

impl<T> SocketEvents for Shared<T>
where
    T: DeserializeOwned + 'static,
{
    fn on_open(self: &Arc<Self>, generation: Generation) {
        self.drive(|machine| machine.opened(generation));
    }

    fn on_message(self: &Arc<Self>, generation: Generation, text: &str) {
        if !self.driver.lock().machine.accepts_message(generation) {
            return;
        }
        match serde_json::from_str::<T>(text) {
            Ok(payload) => {
                self.status_listeners.notify(&payload);
            }
            Err(e) => {
                tracing::error!(
                    generation,
                    error = %StreamError::from(e),
                    "dropping malformed status payload"
                );
            }
        }
    }

    fn on_close(self: &Arc<Self>, generation: Generation, close: CloseEvent) {
        self.drive(|machine| machine.closed(generation, &close));
    }
}
