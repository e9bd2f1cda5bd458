//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Result of a write-style command, rendered in the selected format.
#[derive(Debug, Serialize)]
pub struct Outcome {
    pub operation: &'static str,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl Outcome {
    pub fn new(operation: &'static str, target: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
            response: None,
        }
    }

    pub fn with_response(mut self, response: Option<Value>) -> Self {
        self.response = response;
        self
    }

    pub fn print(&self, global: &GlobalOpts) {
        let mark = output::check_mark(global.color);
        let out = output::render_single(
            global.output,
            self,
            |o| {
                let mut text = format!("{mark} {} {}", o.operation, o.target);
                if let Some(ref response) = o.response {
                    text.push('\n');
                    text.push_str(&output::render_json(response, false));
                }
                text
            },
            |o| o.target.clone(),
        );
        output::print_output(&out, global.quiet);
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Parse a JSON command-line argument.
pub fn parse_json_arg(field: &str, text: &str) -> Result<Value, CliError> {
    serde_json::from_str(text).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Read and parse a JSON file for `--from-file` style flags.
pub fn read_json_file(field: &str, path: &Path) -> Result<Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    parse_json_arg(field, &contents)
}

/// Raw body from `--raw` or `--from-file`, whichever was given.
pub fn raw_body(raw: Option<&str>, from_file: Option<&Path>) -> Result<Option<Value>, CliError> {
    match (raw, from_file) {
        (Some(text), _) => parse_json_arg("raw", text).map(Some),
        (None, Some(path)) => read_json_file("from-file", path).map(Some),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn raw_body_prefers_inline_json() {
        assert_eq!(raw_body(Some("[1]"), None).unwrap(), Some(json!([1])));
        assert_eq!(raw_body(None, None).unwrap(), None);
        assert!(matches!(
            raw_body(Some("{nope"), None),
            Err(CliError::Validation { .. })
        ));
    }
}
