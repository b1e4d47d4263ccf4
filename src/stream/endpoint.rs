//! Status feed endpoint derivation.
//!
//! The feed lives on the page's own host at a fixed path; only the scheme
//! changes, so a page served over TLS talks to the feed over TLS too.

use url::Url;

use crate::error::StreamError;

/// Path of the card-status feed on the backend.
pub const STATUS_FEED_PATH: &str = "/ws/card-status";

/// Derives the feed URL from a page origin.
///
/// `https` maps to `wss`, `http` to `ws`; `ws`/`wss` origins are kept.
/// Host and port are preserved, the path becomes [`STATUS_FEED_PATH`], and
/// any query or fragment is dropped.
///
/// # Errors
///
/// Returns [`StreamError::InvalidOrigin`] if `origin` is not an absolute
/// URL with a host, or [`StreamError::UnsupportedScheme`] for any other
/// scheme.
pub fn status_endpoint(origin: &str) -> Result<Url, StreamError> {
    let mut url = Url::parse(origin.trim()).map_err(|e| StreamError::InvalidOrigin {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(StreamError::UnsupportedScheme(other.to_string())),
    };

    if url.host_str().is_none_or(str::is_empty) {
        return Err(StreamError::InvalidOrigin {
            origin: origin.to_string(),
            reason: "origin has no host".to_string(),
        });
    }

    url.set_scheme(scheme)
        .map_err(|()| StreamError::UnsupportedScheme(scheme.to_string()))?;
    url.set_path(STATUS_FEED_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Checks that this build can open a socket to `url`.
///
/// `wss` needs the `tls` feature; without it every attempt would fail at
/// the handshake.
///
/// # Errors
///
/// Returns [`StreamError::UnsupportedScheme`] for a `wss` endpoint in a
/// build without TLS support.
pub fn ensure_transport(url: &Url) -> Result<(), StreamError> {
    if url.scheme() == "wss" && !cfg!(feature = "tls") {
        return Err(StreamError::UnsupportedScheme(
            "wss (built without the `tls` feature)".to_string(),
        ));
    }
    Ok(())
}
