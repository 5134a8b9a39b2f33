//! Clap derive structures for the `ecotrash` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ecotrash -- admin console for the Ecotrash waste-management backend
#[derive(Debug, Parser)]
#[command(
    name = "ecotrash",
    version,
    about = "Administer Ecotrash managements, locations and clients",
    long_about = "Administer an Ecotrash waste-management backend from the command line.\n\n\
        Every create and update runs through the same form rules the web console\n\
        uses: fields are checked locally before anything is sent, and field errors\n\
        returned by the server are shown next to the field that caused them.",
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
    /// Backend profile to use
    #[arg(long, short = 'p', env = "ECOTRASH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, env = "ECOTRASH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ECOTRASH_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ECOTRASH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ECOTRASH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Never prompt; fail on missing or invalid fields instead
    #[arg(long, global = true)]
    pub no_input: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
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
    /// Log in and store the session
    Login {
        /// Account email (defaults to the profile's)
        #[arg(long, short = 'e')]
        email: Option<String>,
    },

    /// End the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Register a new user account
    Register(FormArgs),

    /// Replace the temporary password of the current account
    Password,

    /// Manage management companies
    #[command(alias = "mgmt", alias = "m")]
    Managements(EntityArgs),

    /// Manage pickup locations
    #[command(alias = "loc", alias = "l")]
    Locations(EntityArgs),

    /// Manage the clients of a management company
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Field values given on the command line instead of prompts.
#[derive(Debug, Args)]
pub struct FormArgs {
    /// Field value as key=value (repeatable)
    #[arg(long = "field", short = 'f', value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,
}

/// Parse a `key=value` pair.
pub fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Case-insensitive filter over names, emails and codes
    #[arg(long, short = 's')]
    pub search: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ENTITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EntityArgs {
    #[command(subcommand)]
    pub command: EntityCommand,
}

#[derive(Debug, Subcommand)]
pub enum EntityCommand {
    /// List records
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show one record
    Get {
        /// Record ID
        id: String,
    },

    /// Create a record
    Create(FormArgs),

    /// Update a record
    Update {
        /// Record ID
        id: String,

        #[command(flatten)]
        form: FormArgs,
    },

    /// Delete a record
    #[command(alias = "rm")]
    Delete {
        /// Record ID
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct ClientsArgs {
    /// Management company the clients belong to (defaults to your own)
    #[arg(long, short = 'm', global = true)]
    pub management: Option<i64>,

    #[command(subcommand)]
    pub command: EntityCommand,
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
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// Set a value on the active profile
    Set {
        /// Key: api_url, email, password_env, insecure, timeout, ca_cert
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a profile's password in the system keyring
    SetPassword {
        /// Profile (defaults to the active one)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
