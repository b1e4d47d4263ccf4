//! Configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`) and every key has a default, so both
//! binaries start with no configuration at all. [`StreamConfig`] can also
//! be assembled in code with its builder-style setters.

use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::error::StreamError;

/// Default page origin the client derives its endpoint from.
pub const DEFAULT_ORIGIN: &str = "http://localhost:5000";

/// Default number of consecutive automatic reconnect attempts.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default fixed delay between a close and the next reconnect attempt.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Client-side configuration for [`crate::stream::StatusStreamClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Origin of the hosting page, e.g. `https://cards.example.com:8443`.
    pub origin: String,

    /// Retry budget: automatic reconnects allowed before giving up.
    pub max_reconnect_attempts: u32,

    /// Fixed delay before each automatic reconnect.
    pub reconnect_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN)
    }
}

impl StreamConfig {
    /// Creates a configuration for the given origin with default retry
    /// settings.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }

    /// Sets the retry budget.
    #[must_use]
    pub const fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the delay between reconnect attempts.
    #[must_use]
    pub const fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Loads the client configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `CARD_STATUS_ORIGIN` | `http://localhost:5000` |
    /// | `CARD_STATUS_MAX_RECONNECT_ATTEMPTS` | `5` |
    /// | `CARD_STATUS_RECONNECT_INTERVAL_MS` | `3000` |
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] if a numeric variable is set
    /// but cannot be parsed.
    pub fn from_env() -> Result<Self, StreamError> {
        dotenvy::dotenv().ok();

        let origin =
            std::env::var("CARD_STATUS_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string());
        let max_reconnect_attempts = parse_env_strict(
            "CARD_STATUS_MAX_RECONNECT_ATTEMPTS",
            DEFAULT_MAX_RECONNECT_ATTEMPTS,
        )?;
        let interval_ms = parse_env_strict(
            "CARD_STATUS_RECONNECT_INTERVAL_MS",
            u64::try_from(DEFAULT_RECONNECT_INTERVAL.as_millis()).unwrap_or(3000),
        )?;

        Ok(Self {
            origin,
            max_reconnect_attempts,
            reconnect_interval: Duration::from_millis(interval_ms),
        })
    }
}

/// Server-side configuration for the `card-status-feed` binary.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:5000`).
    pub listen_addr: SocketAddr,

    /// Seconds between periodic status broadcasts.
    pub broadcast_interval: Duration,

    /// Capacity of the status broadcast channel.
    pub bus_capacity: usize,

    /// Backend endpoint polled for status snapshots. When unset, the feed
    /// publishes fallback snapshots.
    pub status_url: Option<Url>,
}

impl FeedConfig {
    /// Loads the feed configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set or does not parse,
    /// except for `LISTEN_ADDR` and `CARD_STATUS_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidConfig`] if `LISTEN_ADDR` is set but
    /// cannot be parsed as a [`SocketAddr`], or `CARD_STATUS_URL` is set
    /// but is not an absolute URL.
    pub fn from_env() -> Result<Self, StreamError> {
        dotenvy::dotenv().ok();

        let raw_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let listen_addr: SocketAddr =
            raw_addr
                .parse()
                .map_err(|_| StreamError::InvalidConfig {
                    key: "LISTEN_ADDR",
                    value: raw_addr.clone(),
                })?;

        let broadcast_secs = parse_env("STATUS_BROADCAST_INTERVAL_SECS", 2_u64).max(1);
        let bus_capacity = parse_env("STATUS_BUS_CAPACITY", 1024_usize).max(1);
        let status_url = parse_status_url(std::env::var("CARD_STATUS_URL").ok())?;

        Ok(Self {
            listen_addr,
            broadcast_interval: Duration::from_secs(broadcast_secs),
            bus_capacity,
            status_url,
        })
    }
}

/// Parses the optional status URL; blank counts as unset.
fn parse_status_url(raw: Option<String>) -> Result<Option<Url>, StreamError> {
    match raw {
        Some(value) if !value.trim().is_empty() => Url::parse(value.trim())
            .map(Some)
            .map_err(|_| StreamError::InvalidConfig {
                key: "CARD_STATUS_URL",
                value,
            }),
        _ => Ok(None),
    }
}

/// Output format for the tracing subscriber installed by the binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT` (`text` or `json`, case-insensitive).
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_FORMAT").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`parse_env`] but rejects values that are present and malformed.
fn parse_env_strict<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, StreamError> {
    match std::env::var(key) {
        Ok(value) => {
            let parsed = value.trim().parse();
            parsed.map_err(|_| StreamError::InvalidConfig { key, value })
        }
        Err(_) => Ok(default),
    }
}
