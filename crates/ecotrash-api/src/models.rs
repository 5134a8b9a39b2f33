// Wire-level response types
//
// Payload shapes returned by the backend that are not entity records:
// the `{data, message}` envelope used by the auth endpoints, paginated
// lists, and the per-field error map of rejected writes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Envelope ─────────────────────────────────────────────────────────

/// Envelope used by the account endpoints:
/// ```json
/// { "data": { ... }, "message": "optional" }
/// ```
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// List endpoints return a bare array unless pagination is enabled
/// server-side, in which case the rows sit under `results`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListPayload<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListPayload<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Plain(items) | Self::Paged { results: items } => items,
        }
    }
}

// ── Login ────────────────────────────────────────────────────────────

/// `data` payload of `POST accounts/auth/login/`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub user: LoginUser,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub management: Option<LoginManagement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub pk: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub email: String,
    pub role: String,
}

/// Management company the logged-in user belongs to, if any.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginManagement {
    pub pk_management: i64,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Field errors ─────────────────────────────────────────────────────

/// Keys the backend uses for messages that belong to the whole form.
const NON_FIELD_KEYS: [&str; 4] = ["detail", "message", "non_field_errors", "error"];

/// Per-field error payload of a rejected write.
///
/// The backend answers 400/422 with `{"field": ["msg", ...]}`, sometimes
/// wrapped as `{"message": "...", "errors": {...}}`. Messages are kept in
/// server order; nested objects are flattened to dotted names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub non_field: Vec<String>,
}

impl FieldErrors {
    /// Parse a rejected-write body. Returns `None` when the body is not a
    /// JSON object or carries no messages at all.
    pub fn from_body(body: &Value) -> Option<Self> {
        let Value::Object(map) = body else {
            return None;
        };
        let mut errors = Self::default();
        for (key, value) in map {
            if key == "errors" && value.is_object() {
                if let Some(inner) = Self::from_body(value) {
                    errors.merge(inner);
                }
            } else if NON_FIELD_KEYS.contains(&key.as_str()) {
                errors.non_field.extend(messages(value));
            } else {
                errors.collect_field(key, value);
            }
        }
        (!errors.is_empty()).then_some(errors)
    }

    fn collect_field(&mut self, name: &str, value: &Value) {
        if let Value::Object(nested) = value {
            for (key, inner) in nested {
                self.collect_field(&format!("{name}.{key}"), inner);
            }
            return;
        }
        let msgs = messages(value);
        if !msgs.is_empty() {
            self.fields.entry(name.to_owned()).or_default().extend(msgs);
        }
    }

    fn merge(&mut self, other: Self) {
        for (field, msgs) in other.fields {
            self.fields.entry(field).or_default().extend(msgs);
        }
        self.non_field.extend(other.non_field);
    }

    /// First message reported for `field`.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.fields.get(field)?.first().map(String::as_str)
    }

    /// Number of fields with at least one message, plus form-level messages.
    pub fn len(&self) -> usize {
        self.fields.len() + self.non_field.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.non_field.clone();
        for (field, msgs) in &self.fields {
            parts.push(format!("{field}: {}", msgs.join(", ")));
        }
        write!(f, "{}", parts.join("; "))
    }
}

fn messages(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(messages).collect(),
        other => vec![other.to_string()],
    }
}
