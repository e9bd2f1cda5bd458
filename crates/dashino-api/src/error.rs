use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `dashino-api` crate.
///
/// Failures fall into two classes that callers must be able to tell apart:
///
/// - **request** errors: the remote answered with a non-2xx status
///   ([`Error::Request`], the only variant carrying a status code);
/// - **transport** errors: no usable response was obtained
///   ([`Error::Transport`], [`Error::Timeout`], [`Error::Deserialization`]).
///
/// The remaining variants are raised before any I/O happens, while building
/// a client or resolving a target URL.
#[derive(Debug, Error)]
pub enum Error {
    // ── Remote ──────────────────────────────────────────────────────
    /// The remote responded with a non-2xx status.
    ///
    /// `message` is `"Status <code>: <body snippet>"`, the same text stored
    /// in the client's last-error slot.
    #[error("Dashino request failed: {message}")]
    Request { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request did not complete within the configured timeout.
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// A 2xx response declared JSON but the body could not be decoded.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Construction ────────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Base URL parsed but is not usable (wrong scheme, no host).
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Header name or value rejected by the HTTP stack.
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// TLS configuration or HTTP client construction failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A source or state key resolved to the empty string.
    #[error("Dashino {what} is required")]
    EmptyIdentifier { what: &'static str },
}

impl Error {
    /// HTTP status of a request error. `None` for every transport-class
    /// or construction error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the remote answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if the request ran out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if no usable response was obtained.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout { .. } | Self::Deserialization { .. }
        )
    }
}
