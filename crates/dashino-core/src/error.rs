// ── Core error types ──
//
// User-facing errors from dashino-core. Request errors keep their HTTP
// status so callers can still tell "not found" apart; transport failures
// and timeouts stay distinct variants. `from_api` attaches the name of the
// service that failed.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    #[error("{message}")]
    ValidationFailed { message: String },

    #[error("Entity '{entity_id}' not found")]
    EntityNotFound { entity_id: String },

    #[error("Attribute '{attribute}' not found on entity '{entity_id}'")]
    AttributeNotFound { entity_id: String, attribute: String },

    #[error("Value for entity '{entity_id}' is not numeric and cannot be converted")]
    NotNumeric { entity_id: String },

    // ── Remote errors ────────────────────────────────────────────────
    /// The dashboard answered with a non-2xx status.
    #[error("{message}")]
    Request { status: u16, message: String },

    #[error("Dashino {operation} timed out")]
    Timeout { operation: &'static str },

    #[error("Dashino {operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Translate a client error raised while running `operation`.
    pub fn from_api(operation: &'static str, err: dashino_api::Error) -> Self {
        use dashino_api::Error as Api;

        match err {
            Api::Request { status, message } => Self::Request { status, message },
            Api::Timeout { .. } => Self::Timeout { operation },
            Api::Transport(ref e) if e.is_timeout() => Self::Timeout { operation },
            Api::Transport(_) | Api::Deserialization { .. } => Self::Transport {
                operation,
                message: err.to_string(),
            },
            Api::EmptyIdentifier { .. } => Self::ValidationFailed {
                message: err.to_string(),
            },
            Api::InvalidUrl(_)
            | Api::InvalidBaseUrl { .. }
            | Api::InvalidHeader { .. }
            | Api::Tls(_) => Self::Config {
                message: err.to_string(),
            },
        }
    }

    /// HTTP status when the dashboard rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<dashino_config::ConfigError> for CoreError {
    fn from(err: dashino_config::ConfigError) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
