use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::management::active;
use super::{Entity, EntityId, lenient_string};

/// A customer of a management company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub pk_client: i64,
    #[serde(default)]
    pub fk_management: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub legal_name: Option<String>,
    #[serde(default)]
    pub rfc: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number_2: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Client {
    const KIND: &'static str = "client";

    fn id(&self) -> EntityId {
        EntityId::Int(self.pk_client)
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.legal_name.as_deref());
        fields.extend(self.email.as_deref());
        fields.extend(self.rfc.as_deref());
        fields
    }
}
