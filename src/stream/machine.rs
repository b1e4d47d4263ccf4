//! Reconnect state machine.
//!
//! [`ReconnectMachine`] owns every decision the client makes: when to open
//! or close a socket, when to arm or disarm the retry timer, and when to
//! notify connection listeners. It performs no I/O; each input returns the
//! [`Action`]s the driver must carry out, in order.
//!
//! Every socket is tagged with a [`Generation`]. Only the live generation's
//! events are accepted, so a socket that was torn down by `connect` or
//! `disconnect` can never reopen the stream or schedule a retry. Retry
//! timers carry a token for the same reason.

use std::time::Duration;

use super::state::{CloseEvent, ConnectionState, RetryBudget, Visibility};

/// Sequence number identifying one socket.
pub type Generation = u64;

/// Side effect requested by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open a socket tagged with `generation`.
    Open {
        /// Tag for the new socket.
        generation: Generation,
    },
    /// Close the socket tagged with `generation`.
    Close {
        /// Tag of the socket to close.
        generation: Generation,
    },
    /// Arm the retry timer; when it fires, feed `token` back through
    /// [`ReconnectMachine::retry_elapsed`].
    ScheduleRetry {
        /// Identifies this particular timer.
        token: u64,
        /// 1-based attempt number.
        attempt: u32,
        /// How long to wait.
        delay: Duration,
    },
    /// Disarm the pending retry timer.
    CancelRetry,
    /// Notify connection listeners.
    NotifyConnection(bool),
    /// The retry budget is spent; nothing further happens automatically.
    GiveUp {
        /// Attempts made since the last successful open.
        attempts: u32,
    },
}

/// Connection lifecycle and retry policy for one status stream.
#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    budget: RetryBudget,
    interval: Duration,
    generation: Generation,
    live: Option<Generation>,
    retry_seq: u64,
    pending_retry: Option<u64>,
    last_close: Option<CloseEvent>,
}

impl ReconnectMachine {
    /// Creates a disconnected machine with the given retry budget and
    /// fixed retry delay.
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            budget: RetryBudget::new(max_attempts),
            interval,
            generation: 0,
            live: None,
            retry_seq: 0,
            pending_retry: None,
            last_close: None,
        }
    }

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Automatic reconnects consumed since the last successful open.
    #[must_use]
    pub const fn reconnect_attempts(&self) -> u32 {
        self.budget.attempts()
    }

    /// Returns `true` while a retry timer is armed.
    #[must_use]
    pub const fn retry_pending(&self) -> bool {
        self.pending_retry.is_some()
    }

    /// Generation of the socket currently open or opening, if any.
    #[must_use]
    pub const fn live_generation(&self) -> Option<Generation> {
        self.live
    }

    /// How the live socket most recently closed. Cleared by a successful
    /// open.
    #[must_use]
    pub const fn last_close(&self) -> Option<&CloseEvent> {
        self.last_close.as_ref()
    }

    /// Tears down the current socket and pending retry, then opens a new
    /// socket.
    pub fn connect(&mut self) -> Vec<Action> {
        let mut actions = self.disconnect();
        self.generation = self.generation.wrapping_add(1);
        self.live = Some(self.generation);
        self.state = ConnectionState::Connecting;
        actions.push(Action::Open {
            generation: self.generation,
        });
        actions
    }

    /// Closes the current socket, if any, and cancels a pending retry.
    ///
    /// Connection listeners hear `false` only when an open connection is
    /// torn down. Calling this while already disconnected is a no-op.
    pub fn disconnect(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.pending_retry.take().is_some() {
            actions.push(Action::CancelRetry);
        }
        if let Some(generation) = self.live.take() {
            actions.push(Action::Close { generation });
            if self.state == ConnectionState::Connected {
                actions.push(Action::NotifyConnection(false));
            }
        }
        self.state = ConnectionState::Disconnected;
        actions
    }

    /// The socket tagged `generation` finished its handshake.
    pub fn opened(&mut self, generation: Generation) -> Vec<Action> {
        if self.live != Some(generation) || self.state != ConnectionState::Connecting {
            return Vec::new();
        }
        self.state = ConnectionState::Connected;
        self.budget.reset();
        self.last_close = None;
        vec![Action::NotifyConnection(true)]
    }

    /// Returns `true` if a message from the socket tagged `generation`
    /// should be delivered.
    #[must_use]
    pub fn accepts_message(&self, generation: Generation) -> bool {
        self.live == Some(generation) && self.state == ConnectionState::Connected
    }

    /// The socket tagged `generation` closed, cleanly or not.
    ///
    /// Listeners hear `false`; a retry is scheduled while the budget lasts.
    pub fn closed(&mut self, generation: Generation, close: &CloseEvent) -> Vec<Action> {
        if self.live != Some(generation) {
            return Vec::new();
        }
        self.live = None;
        self.last_close = Some(close.clone());
        self.state = ConnectionState::Disconnected;

        let mut actions = vec![Action::NotifyConnection(false)];
        match self.budget.try_consume() {
            Some(attempt) => {
                self.retry_seq = self.retry_seq.wrapping_add(1);
                self.pending_retry = Some(self.retry_seq);
                actions.push(Action::ScheduleRetry {
                    token: self.retry_seq,
                    attempt,
                    delay: self.interval,
                });
            }
            None => actions.push(Action::GiveUp {
                attempts: self.budget.attempts(),
            }),
        }
        actions
    }

    /// The retry timer identified by `token` fired.
    ///
    /// Ignored unless that timer is still the pending one.
    pub fn retry_elapsed(&mut self, token: u64) -> Vec<Action> {
        if self.pending_retry != Some(token) {
            return Vec::new();
        }
        self.pending_retry = None;
        self.connect()
    }

    /// The host's visibility changed.
    ///
    /// Becoming visible while not connected reconnects immediately and
    /// cancels any pending retry.
    pub fn visibility_changed(&mut self, visibility: Visibility) -> Vec<Action> {
        match visibility {
            Visibility::Visible if self.state != ConnectionState::Connected => self.connect(),
            _ => Vec::new(),
        }
    }
}
