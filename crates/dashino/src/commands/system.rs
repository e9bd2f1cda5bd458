//! `dashino health`, `dashino check`, `dashino test`.

use serde::Serialize;

use dashino_core::{CoreError, Dashino, Probe, verify_connection};

use crate::cli::GlobalOpts;
use crate::commands::util::Outcome;
use crate::error::CliError;
use crate::output;

pub async fn health(dash: &Dashino, global: &GlobalOpts) -> Result<(), CliError> {
    dash.client()
        .check_health()
        .await
        .map_err(|e| CoreError::from_api("health check", e))?;
    Outcome::new("health", dash.client().health_url().to_string()).print(global);
    Ok(())
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    base_url: &'a str,
    probe: Probe,
}

pub async fn check(dash: &Dashino, global: &GlobalOpts) -> Result<(), CliError> {
    let base_url = dash.client().base_url();
    let probe = verify_connection(dash.client(), Some(&dash.defaults().source))
        .await
        .map_err(|e| CliError::from_verify(e, base_url))?;

    let report = CheckReport { base_url, probe };
    let mark = output::check_mark(global.color);
    let out = output::render_single(
        global.output,
        &report,
        |r| {
            let via = match r.probe {
                Probe::Health => "/api/health",
                Probe::StateApi => "state API round trip",
            };
            format!("{mark} {} reachable (verified via {via})", r.base_url)
        },
        |r| r.base_url.to_owned(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn test(dash: &Dashino, global: &GlobalOpts) -> Result<(), CliError> {
    let source = global
        .source
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&dash.defaults().source);
    dash.client()
        .test_connectivity(Some(source))
        .await
        .map_err(|e| CoreError::from_api("connectivity test", e))?;
    Outcome::new("test", dash.client().webhook_url(source).to_string()).print(global);
    Ok(())
}
