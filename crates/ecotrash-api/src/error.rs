use thiserror::Error;

use crate::models::FieldErrors;

/// Top-level error type for the `ecotrash-api` crate.
///
/// Covers every failure mode of the REST surface: authentication,
/// transport, rejected writes, and unexpected payloads.
/// `ecotrash-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed, or the bearer token was rejected (HTTP 401).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Authenticated, but not allowed to perform the operation (HTTP 403).
    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup error (bad CA file, client builder failure).
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server responses ────────────────────────────────────────────
    /// The server rejected the payload with per-field messages (HTTP 400/422).
    #[error("Request rejected by server (HTTP {status}): {errors}")]
    Validation { status: u16, errors: FieldErrors },

    /// The requested resource does not exist (HTTP 404).
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Any other non-success status.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the bearer token is missing, expired or revoked.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient transport failure worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::NotFound { .. } => true,
            _ => false,
        }
    }

    /// Per-field messages returned by the server, if this is a rejected write.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}
