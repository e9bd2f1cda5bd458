use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Header carrying the shared secret unless a profile overrides it.
pub const DEFAULT_SECRET_HEADER: &str = "X-Dashino-Secret";

/// Header name used before the secret header became configurable.
pub const LEGACY_SECRET_HEADER: &str = "X-Webhook-Secret";

/// Which authentication material is attached to requests.
///
/// Marker enum (no data) -- the secrets themselves live in [`Credentials`].
/// Useful for logging the auth flow without carrying secret material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// No credentials; only `Content-Type` is sent.
    Anonymous,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// `<secret_header>: <secret>`.
    SharedSecret,
    /// Bearer token and shared secret together.
    BearerAndSecret,
}

/// Credentials for authenticating with a Dashino instance.
///
/// Both mechanisms are optional and independent: a token adds bearer
/// authorization, a secret adds the shared-secret header. Empty values
/// count as absent.
#[derive(Debug, Clone)]
pub struct Credentials {
    api_token: Option<SecretString>,
    secret: Option<SecretString>,
    secret_header: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            api_token: None,
            secret: None,
            secret_header: DEFAULT_SECRET_HEADER.into(),
        }
    }
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_token(mut self, token: Option<SecretString>) -> Self {
        self.api_token = token.filter(|t| !t.expose_secret().is_empty());
        self
    }

    pub fn with_secret(mut self, secret: Option<SecretString>) -> Self {
        self.secret = secret.filter(|s| !s.expose_secret().is_empty());
        self
    }

    /// Override the secret header name. Blank names fall back to
    /// [`DEFAULT_SECRET_HEADER`].
    pub fn with_secret_header(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.trim();
        self.secret_header = if name.is_empty() {
            DEFAULT_SECRET_HEADER.into()
        } else {
            name.to_owned()
        };
        self
    }

    pub fn secret_header(&self) -> &str {
        &self.secret_header
    }

    pub fn has_api_token(&self) -> bool {
        self.api_token.is_some()
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    pub fn strategy(&self) -> AuthStrategy {
        match (self.has_api_token(), self.has_secret()) {
            (false, false) => AuthStrategy::Anonymous,
            (true, false) => AuthStrategy::Bearer,
            (false, true) => AuthStrategy::SharedSecret,
            (true, true) => AuthStrategy::BearerAndSecret,
        }
    }

    /// Build the header set sent with every request.
    ///
    /// Always `Content-Type: application/json`; `Authorization` iff a token
    /// is configured; the secret header iff a secret is configured. Secret
    /// values are marked sensitive so they never show up in debug output.
    pub fn headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref token) = self.api_token {
            let value = sensitive_value(
                AUTHORIZATION.as_str(),
                &format!("Bearer {}", token.expose_secret()),
            )?;
            headers.insert(AUTHORIZATION, value);
        }

        if let Some(ref secret) = self.secret {
            let name = HeaderName::from_bytes(self.secret_header.as_bytes()).map_err(|e| {
                Error::InvalidHeader {
                    name: self.secret_header.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = sensitive_value(&self.secret_header, secret.expose_secret())?;
            headers.insert(name, value);
        }

        Ok(headers)
    }
}

/// Whether `raw` can be sent as an HTTP header value.
pub fn is_valid_header_value(raw: &str) -> bool {
    HeaderValue::from_str(raw).is_ok()
}

fn sensitive_value(name: &str, raw: &str) -> Result<HeaderValue, Error> {
    let mut value = HeaderValue::from_str(raw).map_err(|e| Error::InvalidHeader {
        name: name.into(),
        reason: e.to_string(),
    })?;
    value.set_sensitive(true);
    Ok(value)
}
