//! CLI configuration: thin wrapper around `dashino_config` shared types.
//!
//! Adds CLI-specific resolution that respects `GlobalOpts` flag overrides
//! (--base-url, --api-token, etc.).

use secrecy::SecretString;

use dashino_config::{ResolvedSettings, Settings, resolve_settings};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use dashino_config::{Config, Profile, config_path, load_raw_config_from, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Load the config file, or an empty config when none exists yet.
///
/// Unlike `load_config_or_default`, a file that exists but does not parse
/// is an error.
pub fn load() -> Result<Config, CliError> {
    let path = config_path();
    if !path.exists() {
        return Ok(Config::default());
    }
    Ok(dashino_config::load_config_from(&path)?)
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Highest-precedence layer built from command-line flags.
pub fn flag_layer(global: &GlobalOpts) -> Settings {
    Settings {
        base_url: global.base_url.clone(),
        default_source: global.source.clone(),
        api_token: global.api_token.clone(),
        secret: global.secret.clone(),
        secret_header: global.secret_header.clone(),
        timeout: global.timeout,
        insecure: global.insecure.then_some(true),
        ..Settings::default()
    }
}

/// Resolve settings for the active profile with CLI flag overrides.
///
/// Without a matching profile, `--base-url` alone is enough.
pub fn resolve(global: &GlobalOpts) -> Result<ResolvedSettings, CliError> {
    let cfg = load()?;
    let profile_name = active_profile_name(global, &cfg);
    let flags = flag_layer(global);

    let mut resolved = if cfg.profiles.contains_key(&profile_name) {
        cfg.resolve_profile(&profile_name, &flags)?
    } else if global.base_url.is_some() {
        resolve_settings(&cfg.defaults.overlay(&flags), &profile_name)?
    } else if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    } else {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    };

    // Explicit flags beat the keyring.
    if let Some(token) = non_empty(global.api_token.as_deref()) {
        resolved.api_token = Some(SecretString::from(token.to_owned()));
    }
    if let Some(secret) = non_empty(global.secret.as_deref()) {
        resolved.secret = Some(SecretString::from(secret.to_owned()));
    }

    Ok(resolved)
}

/// Comma-separated profile names, or "(none)".
pub fn available_profiles(cfg: &Config) -> String {
    let names = cfg.profile_names();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
