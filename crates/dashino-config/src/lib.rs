//! Shared configuration for Dashino tools.
//!
//! TOML profiles, options-over-data layering, schema migration, credential
//! resolution (env + keyring + plaintext) and translation to
//! `dashino_api::ClientConfig`.

pub mod settings;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use settings::{
    CURRENT_VERSION, FieldErrors, ResolvedSettings, Settings, is_valid_base_url,
    is_valid_header_name, normalize_base_url, resolve, resolve_layers, validate,
};

/// Keyring service name shared by every profile.
pub const KEYRING_SERVICE: &str = "dashino";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "DASHINO_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid settings for profile '{profile}': {errors}")]
    Invalid {
        profile: String,
        errors: FieldErrors,
    },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Lowest-precedence layer shared by every profile.
    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub defaults: Settings,

    /// Named Dashino profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Settings::default(),
            profiles: HashMap::new(),
        }
    }
}

/// A named Dashino connection.
///
/// The profile's own fields are the data layer written at setup; the
/// `[profiles.<name>.options]` table holds later overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Schema version. Files written before versioning count as version 1.
    #[serde(default = "legacy_version")]
    pub version: u32,

    #[serde(flatten)]
    pub data: Settings,

    #[serde(default, skip_serializing_if = "Settings::is_empty")]
    pub options: Settings,
}

fn legacy_version() -> u32 {
    1
}

impl Profile {
    pub fn new(data: Settings) -> Self {
        Self {
            version: CURRENT_VERSION,
            data,
            options: Settings::default(),
        }
    }

    /// Options over data.
    pub fn effective(&self) -> Settings {
        resolve(&self.data, &self.options)
    }

    /// Upgrade the data layer to the current schema on top of the shared
    /// `[defaults]` layer. Returns `true` when the profile changed and
    /// should be saved.
    pub fn migrate(&mut self, defaults: &Settings) -> bool {
        if !self.data.migrate(self.version, defaults) {
            return false;
        }
        self.version = CURRENT_VERSION;
        true
    }
}

impl Config {
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }

    /// Migrate every profile; returns the names of those that changed.
    pub fn migrate(&mut self) -> Vec<String> {
        let defaults = &self.defaults;
        let mut changed: Vec<String> = self
            .profiles
            .iter_mut()
            .filter_map(|(name, profile)| profile.migrate(defaults).then(|| name.clone()))
            .collect();
        changed.sort();
        for name in &changed {
            debug!(profile = %name, version = CURRENT_VERSION, "migrated profile");
        }
        changed
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.into(),
                available: self.profile_names(),
            })
    }

    /// Flatten `defaults → data → options` for a profile, with an extra
    /// top layer (e.g. CLI flags), without validating.
    pub fn layered(&self, name: &str, overrides: &Settings) -> Result<Settings, ConfigError> {
        let profile = self.profile(name)?;
        Ok(resolve_layers([
            &self.defaults,
            &profile.data,
            &profile.options,
            overrides,
        ]))
    }

    /// Resolve a profile into validated settings with credentials pulled
    /// from the env / keyring / plaintext chain.
    pub fn resolve_profile(
        &self,
        name: &str,
        overrides: &Settings,
    ) -> Result<ResolvedSettings, ConfigError> {
        let layered = self.layered(name, overrides)?;
        resolve_settings(&layered, name)
    }
}

/// Validate a flattened layer and attach credentials.
pub fn resolve_settings(
    layered: &Settings,
    profile_name: &str,
) -> Result<ResolvedSettings, ConfigError> {
    let mut resolved = validate(layered).map_err(|errors| ConfigError::Invalid {
        profile: profile_name.into(),
        errors,
    })?;
    resolved.api_token = resolve_api_token(layered, profile_name);
    resolved.secret = resolve_secret(layered, profile_name);
    Ok(resolved)
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `DASHINO_CONFIG`, then XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "dashino", "dashino").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("dashino");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load a Config from `path` layered over defaults and under `DASHINO_`
/// environment variables (nested keys separated by `__`, e.g.
/// `DASHINO_PROFILES__HOME__BASE_URL`). Profiles are migrated in memory.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let mut config = load_raw_config_from(path)?;
    config.migrate();
    Ok(config)
}

/// Like [`load_config_from`] but leaves old profiles unmigrated.
pub fn load_raw_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DASHINO_").split("__"));

    let config: Config = figment.extract()?;
    debug!(
        path = %path.display(),
        profiles = config.profiles.len(),
        "loaded Dashino config"
    );
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Keyring entry name for a profile secret, e.g. `home/api-token`.
pub fn keyring_key(profile_name: &str, kind: &str) -> String {
    format!("{profile_name}/{kind}")
}

/// Store a secret for a profile in the system keyring.
pub fn store_in_keyring(profile_name: &str, kind: &str, value: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name, kind))?;
    entry.set_password(value)?;
    Ok(())
}

/// Walk the credential chain: named env var → system keyring → plaintext.
fn resolve_credential(
    env_name: Option<&str>,
    plaintext: Option<&str>,
    profile_name: &str,
    kind: &str,
) -> Option<SecretString> {
    // 1. Profile's *_env → env var lookup
    if let Some(env_name) = env_name {
        if let Ok(val) = std::env::var(env_name) {
            if !val.is_empty() {
                return Some(SecretString::from(val));
            }
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_key(profile_name, kind)) {
        if let Ok(secret) = entry.get_password() {
            if !secret.is_empty() {
                return Some(SecretString::from(secret));
            }
        }
    }

    // 3. Plaintext in config
    plaintext
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| SecretString::from(v.to_owned()))
}

/// Resolve the bearer token for a flattened profile layer.
pub fn resolve_api_token(settings: &Settings, profile_name: &str) -> Option<SecretString> {
    resolve_credential(
        settings.api_token_env.as_deref(),
        settings.api_token.as_deref(),
        profile_name,
        "api-token",
    )
}

/// Resolve the shared webhook secret for a flattened profile layer.
pub fn resolve_secret(settings: &Settings, profile_name: &str) -> Option<SecretString> {
    resolve_credential(
        settings.secret_env.as_deref(),
        settings.secret.as_deref(),
        profile_name,
        "secret",
    )
}
