//! Card status snapshot pushed over the feed.
//!
//! Each [`CardStatus`] is a full snapshot of reader/card state, never a
//! delta. Optional fields are omitted from the JSON when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status string used before anything has been published.
pub const STATUS_UNKNOWN: &str = "unknown";

/// Status string for a healthy backend.
pub const STATUS_READY: &str = "ready";

/// Status string for a failed status poll.
pub const STATUS_ERROR: &str = "error";

/// Source tag of the snapshot published when the backend did not answer
/// with a status.
pub const SOURCE_FALLBACK: &str = "websocket_fallback";

/// Source tag of the snapshot published when probing the backend failed.
pub const SOURCE_ERROR: &str = "websocket_error";

/// Health of the backend services behind the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// Card manager (reader driver) is up.
    pub card_manager: bool,
    /// Database is reachable.
    pub database: bool,
}

/// Snapshot of the card/reader state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardStatus {
    /// Overall status, e.g. `"ready"`.
    pub status: String,

    /// When the snapshot was taken. Defaults to the time of parsing when
    /// the backend leaves it out.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Per-service health, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<ServiceHealth>,

    /// Which component produced the snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Failure description for error snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CardStatus {
    /// Initial snapshot before any status has been observed.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            status: STATUS_UNKNOWN.to_string(),
            timestamp: Utc::now(),
            services: None,
            source: None,
            error: None,
        }
    }

    /// Healthy snapshot with every service up.
    #[must_use]
    pub fn ready(source: impl Into<String>) -> Self {
        Self {
            status: STATUS_READY.to_string(),
            timestamp: Utc::now(),
            services: Some(ServiceHealth {
                card_manager: true,
                database: true,
            }),
            source: Some(source.into()),
            error: None,
        }
    }

    /// Assumed-healthy snapshot used when the backend gives no status.
    #[must_use]
    pub fn fallback() -> Self {
        Self::ready(SOURCE_FALLBACK)
    }

    /// Failed status poll.
    #[must_use]
    pub fn error(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            timestamp: Utc::now(),
            services: None,
            source: Some(source.into()),
            error: Some(message.into()),
        }
    }

    /// Returns `true` for error snapshots.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == STATUS_ERROR
    }
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::unknown()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn unknown_omits_optional_fields() {
        let Ok(json) = serde_json::to_value(CardStatus::unknown()) else {
            panic!("serialization failed");
        };
        assert_eq!(json["status"], "unknown");
        assert!(json.get("services").is_none());
        assert!(json.get("error").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn ready_reports_all_services_up() {
        let status = CardStatus::ready("heartbeat");
        assert_eq!(
            status.services,
            Some(ServiceHealth {
                card_manager: true,
                database: true,
            })
        );
        assert_eq!(status.source.as_deref(), Some("heartbeat"));
        assert!(!status.is_error());
    }

    #[test]
    fn error_carries_message() {
        let status = CardStatus::error("reader unplugged", "test");
        assert!(status.is_error());
        assert_eq!(status.error.as_deref(), Some("reader unplugged"));
    }

    #[test]
    fn fallback_is_ready_with_services() {
        let status = CardStatus::fallback();
        assert_eq!(status.status, STATUS_READY);
        assert_eq!(status.source.as_deref(), Some(SOURCE_FALLBACK));
        assert!(status.services.is_some());
    }

    #[test]
    fn missing_timestamp_defaults_to_now() {
        let before = Utc::now();
        let Ok(status) = serde_json::from_str::<CardStatus>(r#"{"status":"ready"}"#) else {
            panic!("deserialization failed");
        };
        assert!(status.timestamp >= before);
    }

    #[test]
    fn accepts_minimal_payload() {
        let json = r#"{"status":"ready","timestamp":"2026-01-01T00:00:00Z"}"#;
        let Ok(status) = serde_json::from_str::<CardStatus>(json) else {
            panic!("deserialization failed");
        };
        assert_eq!(status.status, "ready");
        assert!(status.services.is_none());
    }
}
