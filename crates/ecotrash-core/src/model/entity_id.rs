// ── Entity identity ──
//
// Backend primary keys are integers (`pk_management`, `pk_location`, ...),
// but the console also accepts string keys for endpoints that use them.
// `EntityId` unifies both behind one hashable, displayable type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical identifier for any server-owned record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl EntityId {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        match s.trim().parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Text(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}
