//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use ecotrash_config::ConfigError;
use ecotrash_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the backend at {url}")]
    #[diagnostic(
        code(ecotrash::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             URL: {url}\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(ecotrash::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { url: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(ecotrash::auth_failed),
        help("Check the email and password, then run: ecotrash login")
    )]
    AuthFailed { message: String },

    #[error("Not logged in")]
    #[diagnostic(code(ecotrash::not_logged_in), help("Run: ecotrash login"))]
    NotLoggedIn,

    #[error("Session expired")]
    #[diagnostic(
        code(ecotrash::session_expired),
        help("The stored session was cleared. Run: ecotrash login")
    )]
    SessionExpired,

    #[error("Permission denied: {message}")]
    #[diagnostic(code(ecotrash::forbidden))]
    Forbidden { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(ecotrash::no_credentials),
        help(
            "Store a password with: ecotrash config set-password\n\
             Or set the ECOTRASH_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(ecotrash::not_found),
        help("Run: ecotrash {list_command} to see available records")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Forms ────────────────────────────────────────────────────────
    #[error("The form has errors:\n{errors}")]
    #[diagnostic(
        code(ecotrash::invalid_form),
        help("Fix the fields above, or drop --no-input to be prompted.")
    )]
    InvalidForm { errors: String },

    #[error("Unknown field '{field}' for {form}")]
    #[diagnostic(code(ecotrash::unknown_field), help("Valid fields: {valid}"))]
    UnknownField {
        field: String,
        form: String,
        valid: String,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ecotrash::validation))]
    Validation { field: String, reason: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(ecotrash::api_error))]
    Api { message: String, status: Option<u16> },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ecotrash::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ecotrash config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(ecotrash::no_config),
        help(
            "Create one with: ecotrash config init\n\
             Or pass --api-url. Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(ecotrash::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(ecotrash::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Prompt failed: {0}")]
    #[diagnostic(code(ecotrash::prompt))]
    Prompt(String),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. }
            | Self::NotLoggedIn
            | Self::SessionExpired
            | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::InvalidForm { .. }
            | Self::UnknownField { .. }
            | Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout { url } => Self::Timeout { url },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::NotLoggedIn => Self::NotLoggedIn,
            CoreError::PermissionDenied { message } => Self::Forbidden { message },
            CoreError::ValidationFailed { errors } => Self::InvalidForm {
                errors: errors.to_string(),
            },
            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                list_command: format!("{entity_type}s list"),
                resource_type: entity_type,
                identifier,
            },
            CoreError::InvalidForm { fields } => Self::InvalidForm { errors: fields },
            CoreError::NoOpenForm => Self::Api {
                message: "no form is open".into(),
                status: None,
            },
            CoreError::Api { message, status } => Self::Api { message, status },
            CoreError::Storage { message } | CoreError::Config { message } => {
                Self::Config { message }
            }
            CoreError::Internal(message) => Self::Api {
                message,
                status: None,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::UnknownProfile(name) => Self::ProfileNotFound {
                name,
                available: "(see: ecotrash config profiles)".into(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
