//! Shared helpers for command handlers.

use chrono::{DateTime, Local, Utc};
use ecotrash_core::EntityId;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::prompt;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, global: &GlobalOpts) -> Result<bool, CliError> {
    if global.yes {
        return Ok(true);
    }
    if !prompt::interactive(global) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Prompt(e.to_string()))
}

/// Parse a record ID argument. IDs are numeric on this backend.
pub fn parse_id(raw: &str) -> Result<EntityId, CliError> {
    let id: EntityId = raw.trim().into();
    if id.as_int().is_none() {
        return Err(CliError::Validation {
            field: "id".into(),
            reason: format!("expected a numeric ID, got '{raw}'"),
        });
    }
    Ok(id)
}

/// `-` for absent optional values in detail views.
pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

/// Server timestamp in local time, or `-`.
pub fn local_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "-".to_owned(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_must_be_numeric() {
        assert_eq!(parse_id(" 42 ").ok(), Some(EntityId::Int(42)));
        assert!(parse_id("abc").is_err());
    }

    #[test]
    fn missing_timestamps_render_as_dash() {
        assert_eq!(local_time(None), "-");
        assert_eq!(local_time(Some(Utc::now())).len(), 16);
    }
}
