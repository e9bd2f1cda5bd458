// ── Connection verification ──
//
// The setup-time probe: health first, state API round trip when the
// dashboard predates `/api/health`.

use dashino_api::DashinoClient;
use dashino_config::{FieldErrors, ResolvedSettings, Settings, validate};
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a dashboard could not be accepted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Failed to connect to the Dashino server")]
    CannotConnect,

    #[error("The Dashino server does not expose the state API")]
    StateApiMissing,
}

impl VerifyError {
    /// Stable form error code.
    pub fn code(self) -> &'static str {
        match self {
            Self::CannotConnect => "cannot_connect",
            Self::StateApiMissing => "state_api_missing",
        }
    }
}

/// Endpoint that proved the dashboard reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    Health,
    StateApi,
}

pub async fn verify_connection(
    client: &DashinoClient,
    source: Option<&str>,
) -> Result<Probe, VerifyError> {
    match client.check_health().await {
        Ok(()) => return Ok(Probe::Health),
        Err(e) if e.is_not_found() => {
            debug!("health endpoint missing, probing state API");
        }
        Err(e) => {
            warn!(error = %e, "Dashino health check failed");
            return Err(VerifyError::CannotConnect);
        }
    }

    match client.check_state_api(None, source).await {
        Ok(()) => Ok(Probe::StateApi),
        Err(e) if e.is_not_found() => {
            warn!(error = %e, "Dashino state API not found");
            Err(VerifyError::StateApiMissing)
        }
        Err(e) => {
            warn!(error = %e, "Dashino state API check failed");
            Err(VerifyError::CannotConnect)
        }
    }
}

/// Form field and error code for a client construction failure.
fn rejected_field(
    err: &dashino_api::Error,
    secret_header: &str,
) -> (&'static str, &'static str) {
    match err {
        dashino_api::Error::InvalidHeader { name, .. }
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) =>
        {
            ("api_token", "invalid_token")
        }
        dashino_api::Error::InvalidHeader { name, .. }
            if name.eq_ignore_ascii_case(secret_header) =>
        {
            ("secret", "invalid_secret")
        }
        _ => ("base_url", "invalid_url"),
    }
}

/// Validate user input and prove the dashboard answers.
///
/// Field errors use the same codes as [`validate`]; connection failures
/// land under `base`.
pub async fn setup_entry(
    input: &Settings,
    http: reqwest::Client,
) -> Result<ResolvedSettings, FieldErrors> {
    let resolved = validate(input)?;

    let client = match DashinoClient::new(http, resolved.client_config()) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Dashino client rejected settings");
            let (field, code) = rejected_field(&e, &resolved.secret_header);
            let mut errors = FieldErrors::new();
            errors.insert(field, code);
            return Err(errors);
        }
    };

    if let Err(e) = verify_connection(&client, Some(&resolved.default_source)).await {
        let mut errors = FieldErrors::new();
        errors.insert("base", e.code());
        return Err(errors);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_header(name: &str) -> dashino_api::Error {
        dashino_api::Error::InvalidHeader {
            name: name.into(),
            reason: "failed to parse header value".into(),
        }
    }

    #[test]
    fn header_failures_point_at_the_credential() {
        assert_eq!(
            rejected_field(&invalid_header("authorization"), "X-Dashino-Secret"),
            ("api_token", "invalid_token")
        );
        assert_eq!(
            rejected_field(&invalid_header("X-Dashino-Secret"), "X-Dashino-Secret"),
            ("secret", "invalid_secret")
        );
    }

    #[test]
    fn other_construction_failures_blame_the_url() {
        let err = dashino_api::Error::InvalidBaseUrl {
            url: "ftp://dash".into(),
            reason: "unsupported scheme 'ftp'".into(),
        };
        assert_eq!(
            rejected_field(&err, "X-Dashino-Secret"),
            ("base_url", "invalid_url")
        );
    }
}
