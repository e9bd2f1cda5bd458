//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};
use serde::Serialize;
use tabled::Tabled;

use dashino_api::{DEFAULT_SECRET_HEADER, DEFAULT_SOURCE, TlsMode, TransportConfig};
use dashino_config::{
    CURRENT_VERSION, Settings, is_valid_base_url, is_valid_header_name, normalize_base_url,
    store_in_keyring,
};
use dashino_core::{CoreError, setup_entry};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretKind};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

fn mask(value: Option<&String>) -> Option<String> {
    value.map(|v| {
        if v.is_empty() {
            String::new()
        } else {
            MASK.to_owned()
        }
    })
}

fn redact_layer(layer: &Settings) -> Settings {
    Settings {
        api_token: mask(layer.api_token.as_ref()),
        secret: mask(layer.secret.as_ref()),
        ..layer.clone()
    }
}

/// Copy of the config with plaintext secrets masked.
fn redacted(cfg: &Config) -> Config {
    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: redact_layer(&cfg.defaults),
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, p)| {
                let profile = Profile {
                    version: p.version,
                    data: redact_layer(&p.data),
                    options: redact_layer(&p.options),
                };
                (name.clone(), profile)
            })
            .collect(),
    }
}

fn format_config_redacted(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Apply `key = value` to one settings layer.
fn apply_setting(layer: &mut Settings, key: &str, value: String) -> Result<(), CliError> {
    match key.replace('-', "_").as_str() {
        "base_url" => {
            let url = normalize_base_url(&value);
            if !is_valid_base_url(&url) {
                return Err(invalid("base_url", "must be an http(s) URL with a host"));
            }
            layer.base_url = Some(url);
        }
        "default_source" | "source" => layer.default_source = Some(value),
        "default_state_key" | "state_key" => layer.default_state_key = Some(value),
        "default_widget_id" | "widget_id" => layer.default_widget_id = Some(value),
        "default_type" | "type" => layer.default_type = Some(value),
        "api_token" => layer.api_token = Some(value),
        "api_token_env" => layer.api_token_env = Some(value),
        "secret" => layer.secret = Some(value),
        "secret_env" => layer.secret_env = Some(value),
        "secret_header" => {
            if !is_valid_header_name(value.trim()) {
                return Err(invalid("secret_header", "not a valid HTTP header name"));
            }
            layer.secret_header = Some(value.trim().to_owned());
        }
        "timeout" => {
            let secs: u64 = value
                .parse()
                .map_err(|_| invalid("timeout", "must be a number (seconds)"))?;
            if secs == 0 {
                return Err(invalid("timeout", "must be at least 1 second"));
            }
            layer.timeout = Some(secs);
        }
        "insecure" => {
            layer.insecure = Some(
                value
                    .parse()
                    .map_err(|_| invalid("insecure", "must be 'true' or 'false'"))?,
            );
        }
        "ca_cert" => layer.ca_cert = Some(value.into()),
        other => {
            return Err(invalid(
                other,
                format!(
                    "unknown config key '{other}'. Valid keys: base_url, default_source, \
                     default_state_key, default_widget_id, default_type, api_token, \
                     api_token_env, secret, secret_env, secret_header, timeout, insecure, ca_cert"
                ),
            ));
        }
    }
    Ok(())
}

/// Offer to store a secret in the system keyring or return it for plaintext config.
///
/// Returns `Some(secret)` if the user chose plaintext, `None` if stored in keyring.
fn prompt_keyring_storage(
    secret: &str,
    profile_name: &str,
    kind: SecretKind,
    label: &str,
) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {label}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        store_in_keyring(profile_name, kind.key(), secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret.to_owned()))
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    #[serde(skip)]
    marker: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Base URL")]
    base_url: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Version")]
    version: u32,
    #[tabled(skip)]
    default: bool,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global).await,

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load()?);
            let out = output::render_single(global.output, &cfg, format_config_redacted, |_| {
                config::config_path().display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value, option } => {
            let mut cfg = config::load()?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile::new(Settings::default()));

            let layer = if option {
                &mut profile.options
            } else {
                &mut profile.data
            };
            apply_setting(layer, &key, value)?;

            config::save_config(&cfg)?;
            let target = if option { "options" } else { "data" };
            eprintln!(
                "{} Set {key} on profile '{profile_name}' ({target})",
                output::check_mark(global.color)
            );
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load()?;
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: dashino config init");
                return Ok(());
            }
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let rows: Vec<ProfileRow> = cfg
                .profile_names()
                .into_iter()
                .map(|name| {
                    let effective = cfg.profiles[&name].effective();
                    ProfileRow {
                        marker: if name == default { "*" } else { "" },
                        default: name == default,
                        base_url: effective.base_url.unwrap_or_default(),
                        source: effective
                            .default_source
                            .filter(|s| !s.is_empty())
                            .unwrap_or_else(|| DEFAULT_SOURCE.into()),
                        version: cfg.profiles[&name].version,
                        name,
                    }
                })
                .collect();
            let out = output::render_list(global.output, &rows, Clone::clone, |r| r.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!(
                "{} Default profile set to '{name}'",
                output::check_mark(global.color)
            );
            Ok(())
        }

        // ── SetSecret ───────────────────────────────────────────────
        ConfigCommand::SetSecret { kind } => {
            let cfg = config::load()?;
            let profile_name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let label = match kind {
                SecretKind::ApiToken => "API token: ",
                SecretKind::Secret => "Webhook secret: ",
            };
            let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
            if secret.trim().is_empty() {
                return Err(invalid("secret", "value cannot be empty"));
            }
            store_in_keyring(&profile_name, kind.key(), secret.trim())?;
            eprintln!(
                "{} Stored {} in system keyring for profile '{profile_name}'",
                output::check_mark(global.color),
                kind.key()
            );
            Ok(())
        }

        // ── Migrate ─────────────────────────────────────────────────
        ConfigCommand::Migrate => {
            let path = config::config_path();
            if !path.exists() {
                eprintln!("No configuration file at {}", path.display());
                return Ok(());
            }
            let mut cfg = config::load_raw_config_from(&path)?;
            let migrated = cfg.migrate();
            if migrated.is_empty() {
                eprintln!("All profiles are at version {CURRENT_VERSION}");
                return Ok(());
            }
            config::save_config(&cfg)?;
            for name in &migrated {
                eprintln!(
                    "{} Migrated profile '{name}' to version {CURRENT_VERSION}",
                    output::check_mark(global.color)
                );
            }
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

async fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("Dashino: configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    let base_url: String = Input::new()
        .with_prompt("Dashboard URL")
        .default("http://localhost:3000".into())
        .interact_text()
        .map_err(prompt_err)?;

    let default_source: String = Input::new()
        .with_prompt("Default webhook source")
        .default(DEFAULT_SOURCE.into())
        .interact_text()
        .map_err(prompt_err)?;

    let default_state_key: String = Input::new()
        .with_prompt("Default state key (optional)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let secret_header: String = Input::new()
        .with_prompt("Secret header")
        .default(DEFAULT_SECRET_HEADER.into())
        .interact_text()
        .map_err(prompt_err)?;

    let mut input = Settings {
        base_url: Some(base_url),
        default_source: Some(default_source),
        default_state_key: Some(default_state_key),
        secret_header: Some(secret_header),
        insecure: global.insecure.then_some(true),
        ..Settings::default()
    };

    let api_token = rpassword::prompt_password("API token (leave empty for none): ")
        .map_err(prompt_err)?;
    let secret =
        rpassword::prompt_password("Webhook secret (leave empty for none): ").map_err(prompt_err)?;

    // Verify with the secrets in hand, before deciding where they live.
    input.api_token = Some(api_token.trim().to_owned());
    input.secret = Some(secret.trim().to_owned());

    let tls = if global.insecure {
        TlsMode::DangerAcceptInvalid
    } else {
        TlsMode::System
    };
    let http = TransportConfig {
        tls,
        ..TransportConfig::default()
    }
    .build_client()
    .map_err(|e| CoreError::from_api("setup", e))?;

    let resolved = match setup_entry(&input, http).await {
        Ok(resolved) => resolved,
        Err(errors) => {
            eprintln!("\n   ✗ Verification failed: {errors}");
            if errors.get("base_url").is_some() || errors.get("secret_header").is_some() {
                return Err(CliError::InvalidSettings {
                    profile: profile_name,
                    errors: errors.to_string(),
                });
            }
            let keep = Confirm::new()
                .with_prompt("Save the profile anyway?")
                .default(false)
                .interact()
                .map_err(prompt_err)?;
            if !keep {
                return Err(CliError::InvalidSettings {
                    profile: profile_name,
                    errors: errors.to_string(),
                });
            }
            dashino_config::validate(&input).map_err(|errors| CliError::InvalidSettings {
                profile: profile_name.clone(),
                errors: errors.to_string(),
            })?
        }
    };

    let mut data = resolved.to_settings();
    data.api_token = None;
    data.secret = None;
    if !api_token.trim().is_empty() {
        data.api_token = prompt_keyring_storage(
            api_token.trim(),
            &profile_name,
            SecretKind::ApiToken,
            "API token",
        )?;
    }
    if !secret.trim().is_empty() {
        data.secret = prompt_keyring_storage(
            secret.trim(),
            &profile_name,
            SecretKind::Secret,
            "webhook secret",
        )?;
    }

    let mut cfg = config::load()?;
    cfg.profiles.insert(profile_name.clone(), Profile::new(data));
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: dashino test");
    Ok(())
}
