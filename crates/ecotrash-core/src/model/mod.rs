// ── Domain model ──
//
// Server-owned records shown by the console screens, plus the logged-in
// user. Every record type implements `Entity` so the list synchronizer
// and CRUD screen can stay generic.

mod client;
mod entity_id;
mod location;
mod management;
mod user;

pub use client::Client;
pub use entity_id::EntityId;
pub use location::Location;
pub use management::Management;
pub use user::{CurrentUser, Role};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A record with a primary key and searchable display fields.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human-readable kind, used in logs and "not found" errors.
    const KIND: &'static str;

    fn id(&self) -> EntityId;

    /// Fields matched by the client-side search box.
    fn search_fields(&self) -> Vec<&str>;

    /// Case-insensitive substring match over `search_fields`.
    /// An empty (or whitespace-only) term matches everything.
    fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Accept either a JSON string or a number for text-ish columns
/// (the backend stores house numbers and postcodes inconsistently).
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
