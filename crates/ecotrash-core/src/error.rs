// ── Core error types ──
//
// User-facing errors from ecotrash-core. Consumers never see raw HTTP
// statuses or JSON parse failures; the `From<ecotrash_api::Error>` impl
// translates transport-layer errors into domain variants.

use ecotrash_api::FieldErrors;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to API at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Rejected by server: {errors}")]
    ValidationFailed { errors: FieldErrors },

    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Form has invalid fields: {fields}")]
    InvalidForm { fields: String },

    #[error("No form is open")]
    NoOpenForm,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Storage / configuration ──────────────────────────────────────
    #[error("Session storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The bearer token was rejected; the session must be cleared.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. } | Self::NotLoggedIn)
    }

    /// Connection-level failure the user can retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }

    /// Per-field messages from a rejected write.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::ValidationFailed { errors } => Some(errors),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ecotrash_api::Error> for CoreError {
    fn from(err: ecotrash_api::Error) -> Self {
        match err {
            ecotrash_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            ecotrash_api::Error::Forbidden { message } => CoreError::PermissionDenied { message },
            ecotrash_api::Error::Transport(ref e) => {
                let url = e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string);
                if e.is_timeout() {
                    CoreError::Timeout { url }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url,
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ecotrash_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ecotrash_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ecotrash_api::Error::Validation { errors, .. } => {
                CoreError::ValidationFailed { errors }
            }
            ecotrash_api::Error::NotFound { path } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: path,
            },
            ecotrash_api::Error::Server { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            ecotrash_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_keep_field_map() {
        let mut errors = FieldErrors::default();
        errors.fields.insert("rfc".into(), vec!["Invalid RFC".into()]);
        let core: CoreError = ecotrash_api::Error::Validation {
            status: 400,
            errors: errors.clone(),
        }
        .into();
        assert_eq!(core.field_errors(), Some(&errors));
        assert!(!core.is_unauthorized());
    }

    #[test]
    fn rejected_token_is_unauthorized() {
        let core: CoreError = ecotrash_api::Error::Authentication {
            message: "token expired".into(),
        }
        .into();
        assert!(core.is_unauthorized());
    }

    #[test]
    fn server_fault_carries_status() {
        let core: CoreError = ecotrash_api::Error::Server {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert!(matches!(core, CoreError::Api { status: Some(502), .. }));
    }
}
