//! Clap derive structures for the `dashino` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dashino -- push webhooks and state to a Dashino dashboard
#[derive(Debug, Parser)]
#[command(
    name = "dashino",
    version,
    about = "Push webhook messages and state to a Dashino dashboard",
    long_about = "Command-line client for the Dashino dashboard API.\n\n\
        Forwards webhook messages, writes and clears named state values,\n\
        and verifies that a dashboard is reachable.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Dashboard profile to use
    #[arg(long, short = 'p', env = "DASHINO_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Dashboard base URL (overrides profile)
    #[arg(long, short = 'u', env = "DASHINO_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Webhook source name (overrides the profile's default source)
    #[arg(long, short = 's', env = "DASHINO_SOURCE", global = true)]
    pub source: Option<String>,

    /// Bearer token sent as `Authorization: Bearer ...`
    #[arg(long, env = "DASHINO_API_TOKEN", global = true, hide_env_values = true)]
    pub api_token: Option<String>,

    /// Shared webhook secret
    #[arg(long, env = "DASHINO_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,

    /// Header carrying the shared secret
    #[arg(long, env = "DASHINO_SECRET_HEADER", global = true)]
    pub secret_header: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "DASHINO_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "DASHINO_INSECURE", global = true)]
    pub insecure: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DASHINO_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Forward a message to the dashboard webhook
    #[command(alias = "fwd")]
    Forward(ForwardArgs),

    /// Write, derive, or clear named state values
    #[command(alias = "st")]
    State(StateArgs),

    /// Query the dashboard health endpoint
    Health,

    /// Verify the dashboard the way setup does (health, then state API)
    Check,

    /// Send the fixed connectivity test message
    Test,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FORWARD
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ForwardArgs {
    /// Target widget id
    #[arg(long, short = 'w')]
    pub widget_id: Option<String>,

    /// Message type
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub message_type: Option<String>,

    /// Message data as JSON
    #[arg(long, short = 'd', value_name = "JSON")]
    pub data: Option<String>,

    /// Raw JSON body, sent verbatim
    #[arg(long, value_name = "JSON", conflicts_with_all = ["data", "from_file"])]
    pub raw: Option<String>,

    /// Read the raw JSON body from a file
    #[arg(long, short = 'F', value_name = "PATH", conflicts_with = "data")]
    pub from_file: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StateArgs {
    #[command(subcommand)]
    pub command: StateCommand,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Write a state value
    Set {
        /// State key (defaults to the profile's default state key)
        key: Option<String>,

        /// Value as JSON
        #[arg(long, short = 'd', value_name = "JSON")]
        data: Option<String>,

        /// Raw JSON body, sent verbatim
        #[arg(long, value_name = "JSON", conflicts_with_all = ["data", "from_file"])]
        raw: Option<String>,

        /// Read the raw JSON body from a file
        #[arg(long, short = 'F', value_name = "PATH", conflicts_with = "data")]
        from_file: Option<PathBuf>,

        /// Merge with the stored value (true) or replace it (false)
        #[arg(long, value_name = "BOOL")]
        merge: Option<bool>,

        /// Replace the stored value (same as --merge false)
        #[arg(long)]
        replace: bool,
    },

    /// Write one field derived from an entity's state or attribute
    SetField {
        /// Field name inside the state value
        field: String,

        /// Entity id (domain.object_id)
        entity_id: String,

        /// JSON snapshot of entity states (list or id-keyed map)
        #[arg(long, value_name = "PATH", env = "DASHINO_STATES_FILE")]
        states_file: PathBuf,

        /// State key (defaults to the profile's default state key)
        #[arg(long)]
        key: Option<String>,

        /// Use this attribute instead of the entity state
        #[arg(long, short = 'a')]
        attribute: Option<String>,

        /// JSON object mapping raw values to replacements
        #[arg(long, value_name = "JSON")]
        map: Option<String>,

        /// Convert the value to a number
        #[arg(long)]
        as_number: bool,

        /// Round numeric values to this many digits
        #[arg(long, value_name = "DIGITS", allow_negative_numbers = true)]
        round: Option<i32>,

        /// Merge with the stored value (default true)
        #[arg(long, value_name = "BOOL")]
        merge: Option<bool>,
    },

    /// Delete a state value
    #[command(alias = "rm")]
    Clear {
        /// State key (defaults to the profile's default state key)
        key: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a profile with guided setup (verifies the dashboard)
    Init,

    /// Display the configuration with secrets masked
    Show,

    /// Set a profile value
    Set {
        /// Setting name, e.g. base_url, default_source, secret_header
        key: String,

        /// Value to set
        value: String,

        /// Write to the profile's options layer instead of its data
        #[arg(long)]
        option: bool,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a token or secret in the system keyring
    SetSecret {
        /// Which credential to store
        #[arg(value_enum, default_value = "secret")]
        kind: SecretKind,
    },

    /// Upgrade profiles written by older versions and save them
    Migrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SecretKind {
    /// Bearer token
    ApiToken,
    /// Shared webhook secret
    Secret,
}

impl SecretKind {
    /// Keyring entry suffix.
    pub fn key(self) -> &'static str {
        match self {
            Self::ApiToken => "api-token",
            Self::Secret => "secret",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
