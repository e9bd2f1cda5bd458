//! Command dispatch: bridges CLI args -> core services -> output formatting.

pub mod config_cmd;
pub mod forward;
pub mod state;
pub mod system;
pub mod util;

use dashino_core::Dashino;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a dashboard-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, dash: &Dashino, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Forward(args) => forward::handle(dash, args, global).await,
        Command::State(args) => state::handle(dash, args, global).await,
        Command::Health => system::health(dash, global).await,
        Command::Check => system::check(dash, global).await,
        Command::Test => system::test(dash, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
