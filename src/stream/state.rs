//! Connection state, retry budget, and close/visibility signals.

use std::fmt;

/// Lifecycle of the single status-feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket, or the last socket closed.
    #[default]
    Disconnected,
    /// A socket is being opened.
    Connecting,
    /// The socket is open and delivering status payloads.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Visibility of the host that owns the client.
///
/// Regaining visibility while disconnected triggers an immediate reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The host is in the foreground.
    Visible,
    /// The host is hidden or backgrounded.
    Hidden,
}

/// Counter of consecutive automatic reconnects.
///
/// Reset on every successful open. Each close consumes one attempt until
/// `max` is reached; after that the automatic path stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    attempts: u32,
    max: u32,
}

impl RetryBudget {
    /// Creates a budget allowing `max` consecutive attempts.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { attempts: 0, max }
    }

    /// Consumes one attempt, returning its 1-based number, or `None` once
    /// the budget is exhausted.
    pub fn try_consume(&mut self) -> Option<u32> {
        if self.attempts < self.max {
            self.attempts = self.attempts.saturating_add(1);
            Some(self.attempts)
        } else {
            None
        }
    }

    /// Restores the full budget.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts consumed since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Configured maximum.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Returns `true` when no automatic attempt is left.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= self.max
    }
}

/// Abnormal closure: the transport went away without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// No status code was present in the peer's close frame.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Why a socket closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// RFC 6455 close code.
    pub code: u16,
    /// Close reason text; empty when the peer gave none.
    pub reason: String,
}

impl CloseEvent {
    /// Creates a close event.
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Close without a handshake (connection refused, reset, EOF).
    #[must_use]
    pub fn abnormal() -> Self {
        Self::new(CLOSE_ABNORMAL, "")
    }

    /// Returns `true` for a clean close (code 1000).
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        self.code == 1000
    }
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_hands_out_numbered_attempts() {
        let mut budget = RetryBudget::new(3);
        assert_eq!(budget.try_consume(), Some(1));
        assert_eq!(budget.try_consume(), Some(2));
        assert_eq!(budget.try_consume(), Some(3));
        assert_eq!(budget.try_consume(), None);
        assert!(budget.is_exhausted());
        assert_eq!(budget.attempts(), 3);
    }

    #[test]
    fn reset_restores_budget() {
        let mut budget = RetryBudget::new(2);
        budget.try_consume();
        budget.try_consume();
        budget.reset();
        assert_eq!(budget.attempts(), 0);
        assert_eq!(budget.try_consume(), Some(1));
    }

    #[test]
    fn zero_budget_never_retries() {
        let mut budget = RetryBudget::new(0);
        assert!(budget.is_exhausted());
        assert_eq!(budget.try_consume(), None);
    }

    #[test]
    fn close_event_display() {
        assert_eq!(CloseEvent::abnormal().to_string(), "1006");
        assert_eq!(CloseEvent::new(1001, "going away").to_string(), "1001 going away");
        assert!(CloseEvent::new(1000, "").is_normal());
    }

    #[test]
    fn default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
