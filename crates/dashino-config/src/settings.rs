//! Settings layers, overlay resolution, validation and schema migration.
//!
//! A [`Settings`] value is one layer: every field optional. Layers are
//! stacked in ascending precedence (global defaults, profile data, profile
//! options) and flattened with [`Settings::overlay`]. An upper layer wins
//! whenever it carries the field at all, even as an empty string; blanks
//! only fall back to built-in defaults in [`validate`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use dashino_api::{
    ClientConfig, Credentials, DEFAULT_SECRET_HEADER, DEFAULT_SOURCE, DEFAULT_TIMEOUT,
    LEGACY_SECRET_HEADER, TlsMode, TransportConfig, is_valid_header_value,
};

/// Schema version written by this release.
pub const CURRENT_VERSION: u32 = 2;

// ── Layer ───────────────────────────────────────────────────────────

/// One layer of connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Dashino base URL (e.g. "http://dashboard.local:3000").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Source name used when a call does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_source: Option<String>,

    /// State key used when a state call does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_state_key: Option<String>,

    /// Bearer token (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Environment variable name containing the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token_env: Option<String>,

    /// Shared webhook secret (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Environment variable name containing the shared secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_env: Option<String>,

    /// Header carrying the shared secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_header: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_widget_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_type: Option<String>,

    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Accept self-signed certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Settings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Return `self` with every field present in `upper` replaced.
    #[must_use]
    pub fn overlay(&self, upper: &Settings) -> Settings {
        macro_rules! pick {
            ($($field:ident),+ $(,)?) => {
                Settings {
                    $($field: upper.$field.clone().or_else(|| self.$field.clone()),)+
                }
            };
        }

        pick!(
            base_url,
            default_source,
            default_state_key,
            api_token,
            api_token_env,
            secret,
            secret_env,
            secret_header,
            default_widget_id,
            default_type,
            timeout,
            insecure,
            ca_cert,
        )
    }

    /// Upgrade a layer written by an older schema in place.
    ///
    /// Version 1 predates configurable secret headers and bearer tokens:
    /// missing fields are filled the way a version-1 install behaved.
    /// A field that `below` provides is left absent so the lower layer
    /// still shows through. Returns `true` when the version was old.
    pub fn migrate(&mut self, version: u32, below: &Settings) -> bool {
        if version >= CURRENT_VERSION {
            return false;
        }
        fill(&mut self.secret_header, below.secret_header.as_ref(), || {
            LEGACY_SECRET_HEADER.into()
        });
        fill(&mut self.api_token, below.api_token.as_ref(), String::new);
        fill(
            &mut self.default_state_key,
            below.default_state_key.as_ref(),
            String::new,
        );
        if self.default_source.as_deref() == Some("") {
            self.default_source = Some(DEFAULT_SOURCE.into());
        } else {
            fill(&mut self.default_source, below.default_source.as_ref(), || {
                DEFAULT_SOURCE.into()
            });
        }
        true
    }
}

/// Set `field` unless it or the layer beneath already carries a value.
fn fill<T>(field: &mut Option<T>, below: Option<&T>, default: impl FnOnce() -> T) {
    if field.is_none() && below.is_none() {
        *field = Some(default());
    }
}

/// Flatten layers given in ascending precedence.
pub fn resolve_layers<'a>(layers: impl IntoIterator<Item = &'a Settings>) -> Settings {
    layers
        .into_iter()
        .fold(Settings::default(), |acc, layer| acc.overlay(layer))
}

/// Options-over-data resolution for a single entry.
pub fn resolve(data: &Settings, options: &Settings) -> Settings {
    data.overlay(options)
}

// ── Resolved ────────────────────────────────────────────────────────

/// Fully validated settings with defaults applied.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub base_url: String,
    pub default_source: String,
    pub default_state_key: Option<String>,
    pub api_token: Option<SecretString>,
    pub secret: Option<SecretString>,
    pub secret_header: String,
    pub default_widget_id: Option<String>,
    pub default_type: Option<String>,
    pub timeout: Duration,
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
}

impl ResolvedSettings {
    pub fn credentials(&self) -> Credentials {
        Credentials::new()
            .with_api_token(self.api_token.clone())
            .with_secret(self.secret.clone())
            .with_secret_header(self.secret_header.clone())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone(), self.default_source.clone())
            .with_credentials(self.credentials())
            .with_timeout(self.timeout)
    }

    pub fn transport_config(&self) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            ..TransportConfig::default()
        }
    }

    /// Normalized layer suitable for persisting after a successful setup.
    ///
    /// Secrets are written back as plaintext; callers that keep them in the
    /// keyring should blank them first.
    pub fn to_settings(&self) -> Settings {
        use secrecy::ExposeSecret;

        Settings {
            base_url: Some(self.base_url.clone()),
            default_source: Some(self.default_source.clone()),
            default_state_key: Some(self.default_state_key.clone().unwrap_or_default()),
            api_token: Some(
                self.api_token
                    .as_ref()
                    .map(|t| t.expose_secret().to_owned())
                    .unwrap_or_default(),
            ),
            api_token_env: None,
            secret: Some(
                self.secret
                    .as_ref()
                    .map(|s| s.expose_secret().to_owned())
                    .unwrap_or_default(),
            ),
            secret_env: None,
            secret_header: Some(self.secret_header.clone()),
            default_widget_id: Some(self.default_widget_id.clone().unwrap_or_default()),
            default_type: Some(self.default_type.clone().unwrap_or_default()),
            timeout: Some(self.timeout.as_secs()),
            insecure: self.insecure.then_some(true),
            ca_cert: self.ca_cert.clone(),
        }
    }
}

// ── Validation ──────────────────────────────────────────────────────

/// Per-field error codes from [`validate`], keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, code: impl Into<String>) {
        self.0.insert(field.into(), code.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Trim and strip trailing slashes.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_owned()
}

/// `http`/`https` with a non-empty host.
pub fn is_valid_base_url(url: &str) -> bool {
    url::Url::parse(url).is_ok_and(|u| {
        matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty())
    })
}

/// RFC 7230 token characters.
pub fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

fn clean(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Normalize a flattened layer and apply defaults.
///
/// Secrets are taken from the plaintext fields; callers with a credential
/// chain replace them afterwards.
pub fn validate(input: &Settings) -> Result<ResolvedSettings, FieldErrors> {
    let mut errors = FieldErrors::new();

    let base_url = normalize_base_url(input.base_url.as_deref().unwrap_or_default());
    if !is_valid_base_url(&base_url) {
        errors.insert("base_url", "invalid_url");
    }

    let secret_header =
        clean(input.secret_header.as_ref()).unwrap_or_else(|| DEFAULT_SECRET_HEADER.into());
    if !is_valid_header_name(&secret_header) {
        errors.insert("secret_header", "invalid_header");
    }

    let api_token = clean(input.api_token.as_ref());
    if api_token
        .as_deref()
        .is_some_and(|t| !is_valid_header_value(&format!("Bearer {t}")))
    {
        errors.insert("api_token", "invalid_token");
    }

    let secret = clean(input.secret.as_ref());
    if secret.as_deref().is_some_and(|s| !is_valid_header_value(s)) {
        errors.insert("secret", "invalid_secret");
    }

    let timeout = match input.timeout {
        Some(0) => {
            errors.insert("timeout", "invalid_timeout");
            DEFAULT_TIMEOUT
        }
        Some(secs) => Duration::from_secs(secs),
        None => DEFAULT_TIMEOUT,
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ResolvedSettings {
        base_url,
        default_source: clean(input.default_source.as_ref())
            .unwrap_or_else(|| DEFAULT_SOURCE.into()),
        default_state_key: clean(input.default_state_key.as_ref()),
        api_token: api_token.map(SecretString::from),
        secret: secret.map(SecretString::from),
        secret_header,
        default_widget_id: clean(input.default_widget_id.as_ref()),
        default_type: clean(input.default_type.as_ref()),
        timeout,
        insecure: input.insecure.unwrap_or(false),
        ca_cert: input.ca_cert.clone(),
    })
}
