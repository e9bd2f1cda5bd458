//! `dashino state` handlers.

use serde_json::{Map, Value};

use dashino_core::{
    ClearStateRequest, Dashino, EntitySnapshot, SetStateFieldRequest, SetStateRequest,
};

use crate::cli::{GlobalOpts, StateArgs, StateCommand};
use crate::commands::util::{self, Outcome};
use crate::error::CliError;

pub async fn handle(dash: &Dashino, args: StateArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        StateCommand::Set {
            key,
            data,
            raw,
            from_file,
            merge,
            replace,
        } => {
            let req = SetStateRequest {
                key,
                data: data
                    .as_deref()
                    .map(|d| util::parse_json_arg("data", d))
                    .transpose()?,
                raw: util::raw_body(raw.as_deref(), from_file.as_deref())?,
                merge,
                replace: replace.then_some(true),
                source: global.source.clone(),
            };
            let key = dash.state_key(req.key.as_deref())?.to_owned();
            let response = dash.set_state(&req).await?;
            Outcome::new("set_state", key)
                .with_response(response)
                .print(global);
            Ok(())
        }

        StateCommand::SetField {
            field,
            entity_id,
            states_file,
            key,
            attribute,
            map,
            as_number,
            round,
            merge,
        } => {
            let snapshot = EntitySnapshot::from_json(util::read_json_file(
                "states-file",
                &states_file,
            )?)
            .map_err(|e| CliError::Validation {
                field: "states-file".into(),
                reason: format!("not an entity state export: {e}"),
            })?;
            let map = map.as_deref().map(parse_map).transpose()?;

            let req = SetStateFieldRequest {
                key,
                field,
                entity_id,
                attribute,
                map,
                as_number,
                round,
                merge,
                source: global.source.clone(),
            };
            let key = dash.state_key(req.key.as_deref())?.to_owned();
            let response = dash.set_state_field(&req, &snapshot).await?;
            Outcome::new("set_state_field", key)
                .with_response(response)
                .print(global);
            Ok(())
        }

        StateCommand::Clear { key } => {
            let req = ClearStateRequest {
                key,
                source: global.source.clone(),
            };
            let key = dash.state_key(req.key.as_deref())?.to_owned();
            if !util::confirm(&format!("Clear state '{key}'?"), "state clear", global.yes)? {
                return Ok(());
            }
            dash.clear_state(&req).await?;
            Outcome::new("clear_state", key).print(global);
            Ok(())
        }
    }
}

fn parse_map(text: &str) -> Result<Map<String, Value>, CliError> {
    match util::parse_json_arg("map", text)? {
        Value::Object(map) => Ok(map),
        _ => Err(CliError::Validation {
            field: "map".into(),
            reason: "expected a JSON object".into(),
        }),
    }
}
