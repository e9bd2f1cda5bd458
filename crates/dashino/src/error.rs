//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use dashino_config::ConfigError;
use dashino_core::{CoreError, VerifyError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Dashino {operation} failed: {reason}")]
    #[diagnostic(
        code(dashino::connection_failed),
        help(
            "Check that the dashboard is running and reachable.\n\
             Try: dashino check --base-url http://<host>:<port>"
        )
    )]
    ConnectionFailed { operation: String, reason: String },

    #[error("Could not verify the dashboard at {url}")]
    #[diagnostic(
        code(dashino::cannot_connect),
        help("Neither /api/health nor the state API answered successfully.")
    )]
    CannotConnect { url: String },

    #[error("The dashboard at {url} does not expose the state API")]
    #[diagnostic(
        code(dashino::state_api_missing),
        help("Upgrade the dashboard to a release with /api/states support.")
    )]
    StateApiMissing { url: String },

    #[error("Dashino {operation} timed out")]
    #[diagnostic(
        code(dashino::timeout),
        help("Increase the timeout with --timeout or check dashboard responsiveness.")
    )]
    Timeout { operation: String },

    // ── Remote ───────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(dashino::request_failed))]
    RequestFailed { status: u16, message: String },

    #[error("{message}")]
    #[diagnostic(
        code(dashino::unauthorized),
        help(
            "The dashboard rejected the credentials.\n\
             Store them with: dashino config set-secret api-token (or secret)"
        )
    )]
    Unauthorized { status: u16, message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(dashino::not_found), help("{hint}"))]
    NotFound {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dashino::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid settings for profile '{profile}': {errors}")]
    #[diagnostic(
        code(dashino::invalid_settings),
        help("Fix them with: dashino config set <key> <value> --profile {profile}")
    )]
    InvalidSettings { profile: String, errors: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(dashino::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: dashino config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No Dashino dashboard configured")]
    #[diagnostic(
        code(dashino::no_config),
        help(
            "Create a profile with: dashino config init\n\
             Or pass --base-url / set DASHINO_BASE_URL.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(dashino::config))]
    Config(Box<figment::Error>),

    #[error("Failed to write configuration: {reason}")]
    #[diagnostic(code(dashino::config_write))]
    ConfigWrite { reason: String },

    #[error("Keyring error: {reason}")]
    #[diagnostic(
        code(dashino::keyring),
        help("Use the *_env settings or plaintext values if no keyring is available.")
    )]
    Keyring { reason: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(dashino::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(dashino::json), help("Check the JSON text or file and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::CannotConnect { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Unauthorized { .. } => exit_code::AUTH,
            Self::RequestFailed { status: 404, .. }
            | Self::NotFound { .. }
            | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::InvalidSettings { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn from_verify(err: VerifyError, url: &str) -> Self {
        match err {
            VerifyError::CannotConnect => Self::CannotConnect { url: url.into() },
            VerifyError::StateApiMissing => Self::StateApiMissing { url: url.into() },
        }
    }
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::EntityNotFound { entity_id } => CliError::NotFound {
                resource_type: "Entity".into(),
                identifier: entity_id,
                hint: "Check the entity id against the --states-file snapshot.".into(),
            },

            CoreError::AttributeNotFound {
                entity_id,
                attribute,
            } => CliError::NotFound {
                resource_type: "Attribute".into(),
                identifier: attribute,
                hint: format!("Entity '{entity_id}' has no such attribute in the snapshot."),
            },

            err @ CoreError::NotNumeric { .. } => CliError::Validation {
                field: "as_number".into(),
                reason: err.to_string(),
            },

            CoreError::Request { status, message } if matches!(status, 401 | 403) => {
                CliError::Unauthorized { status, message }
            }

            CoreError::Request { status, message } => CliError::RequestFailed { status, message },

            CoreError::Timeout { operation } => CliError::Timeout {
                operation: operation.into(),
            },

            CoreError::Transport { operation, message } => CliError::ConnectionFailed {
                operation: operation.into(),
                reason: message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid { profile, errors } => CliError::InvalidSettings {
                profile,
                errors: errors.to_string(),
            },
            ConfigError::ProfileNotFound { name, available } => CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            },
            ConfigError::Figment(err) => CliError::Config(err),
            ConfigError::Serialization(err) => CliError::ConfigWrite {
                reason: err.to_string(),
            },
            ConfigError::Keyring(err) => CliError::Keyring {
                reason: err.to_string(),
            },
            ConfigError::Io(err) => CliError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let timeout: CliError = CoreError::Timeout {
            operation: "forward",
        }
        .into();
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let missing: CliError = CoreError::Request {
            status: 404,
            message: "Status 404: gone".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let server: CliError = CoreError::Request {
            status: 500,
            message: "Status 500: boom".into(),
        }
        .into();
        assert_eq!(server.exit_code(), exit_code::GENERAL);
        assert_eq!(server.to_string(), "Status 500: boom");

        let auth: CliError = CoreError::Request {
            status: 401,
            message: "Status 401: nope".into(),
        }
        .into();
        assert_eq!(auth.exit_code(), exit_code::AUTH);

        let transport: CliError = CoreError::Transport {
            operation: "set_state",
            message: "connection refused".into(),
        }
        .into();
        assert_eq!(transport.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn verify_errors_map_to_distinct_diagnostics() {
        let err = CliError::from_verify(VerifyError::StateApiMissing, "http://dash");
        assert_eq!(err.exit_code(), exit_code::GENERAL);
        let err = CliError::from_verify(VerifyError::CannotConnect, "http://dash");
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }
}
