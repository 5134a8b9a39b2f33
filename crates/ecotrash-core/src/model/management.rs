use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId};

/// A management company: the tenant that owns clients and collectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Management {
    pub pk_management: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub phone_number_2: Option<String>,
    #[serde(default)]
    pub rfc: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

pub(super) fn active() -> bool {
    true
}

impl Entity for Management {
    const KIND: &'static str = "management";

    fn id(&self) -> EntityId {
        EntityId::Int(self.pk_management)
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.email.as_deref());
        fields.extend(self.rfc.as_deref());
        fields
    }
}
