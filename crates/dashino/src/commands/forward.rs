//! `dashino forward`

use dashino_core::{Dashino, ForwardRequest};

use crate::cli::{ForwardArgs, GlobalOpts};
use crate::commands::util::{self, Outcome};
use crate::error::CliError;

pub async fn handle(
    dash: &Dashino,
    args: ForwardArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let data = args
        .data
        .as_deref()
        .map(|d| util::parse_json_arg("data", d))
        .transpose()?;
    let raw = util::raw_body(args.raw.as_deref(), args.from_file.as_deref())?;

    let req = ForwardRequest {
        widget_id: args.widget_id,
        message_type: args.message_type,
        data,
        raw,
        source: global.source.clone(),
    };
    dash.forward(&req).await?;

    let source = req
        .source
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(&dash.defaults().source);
    Outcome::new("forward", dash.client().webhook_url(source).to_string()).print(global);
    Ok(())
}
