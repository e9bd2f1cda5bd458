// dashino-api: Async Rust client for the Dashino webhook and state API

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::{
    AuthStrategy, Credentials, DEFAULT_SECRET_HEADER, LEGACY_SECRET_HEADER, is_valid_header_value,
};
pub use client::{ClientConfig, DEFAULT_TIMEOUT, DashinoClient, MAX_ERROR_BODY_CHARS};
pub use error::Error;
pub use models::{StateUpdate, WebhookMessage, connectivity_probe};
pub use transport::{TlsMode, TransportConfig};

/// Source name used when nothing else is configured.
pub const DEFAULT_SOURCE: &str = "homeassistant";
