//! HTTP status poller.
//!
//! [`HttpStatusPoller`] asks the backend's status endpoint for a snapshot
//! each time the broadcaster ticks:
//!
//! - `200 OK` with a status body: that snapshot is published as-is.
//! - Any other response: the backend is up but has no status to give, so a
//!   [`CardStatus::fallback`] snapshot is published.
//! - No response or an unreadable body: an error snapshot tagged
//!   [`SOURCE_ERROR`] carries the failure.

use std::time::Duration;

use reqwest::StatusCode;
use url::Url;

use super::broadcaster::StatusSource;
use super::status::{CardStatus, SOURCE_ERROR};
use crate::error::StreamError;

/// Polls a backend `GET` endpoint for [`CardStatus`] snapshots.
#[derive(Debug, Clone)]
pub struct HttpStatusPoller {
    client: reqwest::Client,
    url: Url,
}

impl HttpStatusPoller {
    /// Creates a poller for `url`. Each request gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::StatusPoll`] if the HTTP client cannot be built.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, StreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    /// Endpoint being polled.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Queries the backend once and turns the outcome into a snapshot.
    pub async fn poll(&self) -> CardStatus {
        match self.fetch().await {
            Ok(Some(status)) => status,
            Ok(None) => CardStatus::fallback(),
            Err(e) => {
                tracing::error!(url = %self.url, error = %e, "error getting card status");
                CardStatus::error(e.to_string(), SOURCE_ERROR)
            }
        }
    }

    async fn fetch(&self) -> Result<Option<CardStatus>, StreamError> {
        let response = self.client.get(self.url.clone()).send().await?;
        if response.status() != StatusCode::OK {
            tracing::warn!(
                url = %self.url,
                status = response.status().as_u16(),
                "status endpoint gave no snapshot; publishing fallback"
            );
            return Ok(None);
        }
        Ok(Some(response.json::<CardStatus>().await?))
    }
}

impl StatusSource for HttpStatusPoller {
    async fn current_status(&self) -> CardStatus {
        self.poll().await
    }
}
