//! Error types for the status stream client and its configuration.
//!
//! [`StreamError`] covers everything that can go wrong while building a
//! client or the feed's status poller. Runtime connectivity problems are
//! never returned to callers; they are logged and fed into the reconnect
//! logic or turned into error snapshots instead, so the transport, poll
//! and payload variants only appear in log fields and snapshots.

/// Library error enum.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The configured page origin could not be parsed as a URL.
    #[error("invalid origin {origin:?}: {reason}")]
    InvalidOrigin {
        /// The origin string as configured.
        origin: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The origin uses a scheme that has no WebSocket counterpart.
    #[error("unsupported origin scheme: {0}")]
    UnsupportedScheme(String),

    /// A client was built outside of a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    /// A configuration value could not be parsed.
    #[error("invalid configuration value for {key}: {value:?}")]
    InvalidConfig {
        /// Environment key.
        key: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },

    /// WebSocket transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// The backend status endpoint could not be queried.
    #[error("status poll failed: {0}")]
    StatusPoll(#[from] reqwest::Error),

    /// Inbound payload could not be deserialized.
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_key() {
        let err = StreamError::InvalidConfig {
            key: "CARD_STATUS_RECONNECT_INTERVAL_MS",
            value: "soon".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration value for CARD_STATUS_RECONNECT_INTERVAL_MS: \"soon\""
        );
    }

    #[test]
    fn payload_errors_convert() {
        let Err(err) = serde_json::from_str::<serde_json::Value>("{oops") else {
            panic!("expected a parse failure");
        };
        assert!(matches!(StreamError::from(err), StreamError::Payload(_)));
    }

    #[test]
    fn display_names_the_origin() {
        let err = StreamError::InvalidOrigin {
            origin: "::nope".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert!(err.to_string().contains("::nope"));
    }
}
