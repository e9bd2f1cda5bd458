// Dashino HTTP client
//
// Wraps a shared `reqwest::Client` with Dashino URL construction, auth
// headers, per-request timeouts and status normalization. Every request
// updates the last-error slot: cleared on 2xx, overwritten on failure.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::auth::Credentials;
use crate::error::Error;
use crate::models::{StateUpdate, connectivity_probe};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response bodies are cut to this many characters in error messages.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// Connection parameters for a [`DashinoClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub default_source: String,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, default_source: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_source: default_source.into(),
            credentials: Credentials::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Async client for one Dashino instance.
///
/// Holds the normalized base URL, the precomputed header set and a clone of
/// an externally owned `reqwest::Client`. Construction performs no I/O.
/// Concurrent calls are fine; they race on the last-error slot, which is
/// last-write-wins and purely diagnostic.
#[derive(Debug)]
pub struct DashinoClient {
    http: reqwest::Client,
    base_url: Url,
    default_source: String,
    credentials: Credentials,
    headers: HeaderMap,
    timeout: Duration,
    last_error: RwLock<Option<String>>,
}

impl DashinoClient {
    /// Create a client over a shared HTTP pool.
    ///
    /// Fails when the base URL is not an absolute `http`/`https` URL with a
    /// host, or when the credentials cannot be encoded as headers.
    pub fn new(http: reqwest::Client, config: ClientConfig) -> Result<Self, Error> {
        let base_url = parse_base_url(&config.base_url)?;
        let headers = config.credentials.headers()?;

        debug!(
            base_url = %base_url,
            auth = ?config.credentials.strategy(),
            timeout = ?config.timeout,
            "created Dashino client"
        );

        Ok(Self {
            http,
            base_url,
            default_source: config.default_source,
            credentials: config.credentials,
            headers,
            timeout: config.timeout,
            last_error: RwLock::new(None),
        })
    }

    /// The normalized base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn default_source(&self) -> &str {
        &self.default_source
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Headers attached to every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Summary of the most recent failure, or `None` after a success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/api/webhooks/{source}`
    pub fn webhook_url(&self, source: &str) -> Url {
        self.endpoint(&["api", "webhooks", source])
    }

    /// `{base}/api/states/{key}/value`
    pub fn state_value_url(&self, key: &str) -> Url {
        self.endpoint(&["api", "states", key, "value"])
    }

    /// `{base}/api/health`
    pub fn health_url(&self) -> Url {
        self.endpoint(&["api", "health"])
    }

    /// Append path segments to the base URL. Each segment is
    /// percent-encoded, so a key containing `/` or `?` stays one segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn resolve_source<'a>(&'a self, source: Option<&'a str>) -> Result<&'a str, Error> {
        let source = source
            .filter(|s| !s.is_empty())
            .unwrap_or(self.default_source.as_str());
        if source.is_empty() {
            return Err(Error::EmptyIdentifier { what: "source" });
        }
        Ok(source)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Send a payload to the Dashino webhook.
    ///
    /// `POST /api/webhooks/{source}`; `source` falls back to the default.
    pub async fn forward_webhook<P>(&self, source: Option<&str>, payload: &P) -> Result<(), Error>
    where
        P: Serialize + Sync + ?Sized,
    {
        let source = self.resolve_source(source)?;
        let url = self.webhook_url(source);
        self.execute(Method::POST, url, Some(payload)).await?;
        Ok(())
    }

    /// Write a state value.
    ///
    /// `POST /api/states/{key}/value`. Returns the echoed JSON when the
    /// response declares a JSON content type.
    pub async fn set_state_value<B>(&self, key: &str, body: &B) -> Result<Option<Value>, Error>
    where
        B: Serialize + Sync + ?Sized,
    {
        if key.is_empty() {
            return Err(Error::EmptyIdentifier { what: "state key" });
        }
        let url = self.state_value_url(key);
        self.execute(Method::POST, url, Some(body)).await
    }

    /// Delete a state value.
    ///
    /// `DELETE /api/states/{key}/value`. A 404 is returned as an ordinary
    /// request error; callers decide whether "already absent" is fine.
    pub async fn clear_state_value(&self, key: &str) -> Result<(), Error> {
        if key.is_empty() {
            return Err(Error::EmptyIdentifier { what: "state key" });
        }
        let url = self.state_value_url(key);
        self.execute::<()>(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// `GET /api/health`. A 404 means the remote predates the endpoint.
    pub async fn check_health(&self) -> Result<(), Error> {
        let url = self.health_url();
        self.execute::<()>(Method::GET, url, None).await?;
        Ok(())
    }

    /// Prove the state API exists with a write-then-delete round trip.
    ///
    /// The write uses `merge = false`. A 404 on the delete still proves the
    /// API is there and is swallowed; every other failure propagates.
    /// Without an explicit key a unique `dashino-probe-*` key is used.
    pub async fn check_state_api(
        &self,
        test_key: Option<&str>,
        source: Option<&str>,
    ) -> Result<(), Error> {
        let source = self.resolve_source(source)?.to_owned();
        let key = match test_key.filter(|k| !k.is_empty()) {
            Some(key) => key.to_owned(),
            None => format!("dashino-probe-{}", uuid::Uuid::new_v4().simple()),
        };

        let body = StateUpdate {
            data: json!({ "ok": true }),
            merge: false,
            source,
        };
        self.set_state_value(&key, &body).await?;

        match self.clear_state_value(&key).await {
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "state probe delete returned 404, treating as absent");
                Ok(())
            }
            other => other,
        }
    }

    /// Forward the fixed `dashino-test` payload.
    pub async fn test_connectivity(&self, source: Option<&str>) -> Result<(), Error> {
        self.forward_webhook(source, &connectivity_probe()).await
    }

    // ── Request execution ────────────────────────────────────────────

    async fn execute<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Option<Value>, Error>
    where
        B: Serialize + Sync + ?Sized,
    {
        debug!("{method} {url}");

        let mut builder = self
            .http
            .request(method, url)
            .headers(self.headers.clone())
            .timeout(self.timeout);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| self.record(self.transport_error(e)))?;
        let status = resp.status();

        if status.is_success() {
            let parsed = if is_json(resp.headers()) {
                let text = resp
                    .text()
                    .await
                    .map_err(|e| self.record(self.transport_error(e)))?;
                parse_json_body(text).map_err(|e| self.record(e))?
            } else {
                None
            };
            self.set_last_error(None);
            return Ok(parsed);
        }

        let body = resp.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        let message = format!("Status {}: {snippet}", status.as_u16());
        debug!(status = status.as_u16(), "request rejected");
        self.set_last_error(Some(message.clone()));

        Err(Error::Request {
            status: status.as_u16(),
            message,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout: self.timeout,
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Store a one-line summary of a transport-class failure.
    fn record(&self, err: Error) -> Error {
        debug!(error = %err, "request failed");
        self.set_last_error(Some(err.to_string()));
        err
    }

    fn set_last_error(&self, value: Option<String>) {
        *self
            .last_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// Parse and validate a base URL: trimmed, trailing slashes stripped,
/// `http`/`https` with a host.
fn parse_base_url(raw: &str) -> Result<Url, Error> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::InvalidBaseUrl {
            url: raw.into(),
            reason: "must not be empty".into(),
        });
    }

    let url = Url::parse(trimmed)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidBaseUrl {
            url: raw.into(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidBaseUrl {
            url: raw.into(),
            reason: "missing host".into(),
        });
    }
    Ok(url)
}

/// `application/json` or any `+json` media type.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase())
        .is_some_and(|essence| essence == "application/json" || essence.ends_with("+json"))
}

fn parse_json_body(text: String) -> Result<Option<Value>, Error> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text).map(Some).map_err(|e| {
        let preview: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: text,
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use reqwest::header::HeaderValue;

    use super::*;

    fn client(base: &str) -> DashinoClient {
        DashinoClient::new(
            reqwest::Client::new(),
            ClientConfig::new(base, "homeassistant"),
        )
        .unwrap()
    }

    #[test]
    fn base_url_is_normalized() {
        let c = client("  https://dash.local:8080/  ");
        assert_eq!(c.base_url(), "https://dash.local:8080");
        assert_eq!(
            c.webhook_url("ha").as_str(),
            "https://dash.local:8080/api/webhooks/ha"
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let c = client("http://host/dashino//");
        assert_eq!(
            c.state_value_url("lights").as_str(),
            "http://host/dashino/api/states/lights/value"
        );
        assert_eq!(c.health_url().as_str(), "http://host/dashino/api/health");
    }

    #[test]
    fn reserved_characters_stay_in_one_segment() {
        let c = client("http://host");
        assert_eq!(
            c.state_value_url("a/b?c").as_str(),
            "http://host/api/states/a%2Fb%3Fc/value"
        );
    }

    #[test]
    fn rejects_bad_base_urls() {
        let http = reqwest::Client::new();
        for bad in ["", "   ", "ftp://host", "not a url", "http://"] {
            let result = DashinoClient::new(http.clone(), ClientConfig::new(bad, "src"));
            assert!(result.is_err(), "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn json_content_type_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/problem+json"));
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    #[test]
    fn blank_json_body_yields_none() {
        assert_eq!(parse_json_body("  ".into()).unwrap(), None);
        assert!(matches!(
            parse_json_body("{oops".into()),
            Err(Error::Deserialization { .. })
        ));
    }
}
