use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::management::active;
use super::{Entity, EntityId, lenient_string};

/// A physical pickup location (warehouse, branch, collection point).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub pk_location: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub exterior_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub interior_number: Option<String>,
    #[serde(default)]
    pub street_name: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone_number: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Location {
    /// One-line street address, e.g. `"Av. Juarez 120-4, Centro, Monterrey"`.
    pub fn address(&self) -> String {
        let mut street = self.street_name.clone().unwrap_or_default();
        if let Some(ext) = &self.exterior_number {
            street = format!("{street} {ext}");
        }
        if let Some(int) = self.interior_number.as_deref().filter(|s| !s.is_empty()) {
            street = format!("{street}-{int}");
        }
        let mut parts = vec![street.trim().to_owned()];
        parts.extend(self.neighborhood.clone());
        parts.extend(self.city.clone());
        parts.retain(|p| !p.is_empty());
        parts.join(", ")
    }
}

impl Entity for Location {
    const KIND: &'static str = "location";

    fn id(&self) -> EntityId {
        EntityId::Int(self.pk_location)
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str()];
        fields.extend(self.street_name.as_deref());
        fields.extend(self.phone_number.as_deref());
        fields
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_house_numbers_deserialize_as_text() {
        let loc: Location = serde_json::from_value(json!({
            "pk_location": 3,
            "name": "Depot",
            "exterior_number": 120,
            "interior_number": null,
            "postcode": "64000",
            "street_name": "Av. Juarez",
            "neighborhood": "Centro",
            "city": "Monterrey"
        }))
        .unwrap();

        assert_eq!(loc.exterior_number.as_deref(), Some("120"));
        assert_eq!(loc.interior_number, None);
        assert!(loc.is_active);
        assert_eq!(loc.address(), "Av. Juarez 120, Centro, Monterrey");
    }

    #[test]
    fn search_covers_street_and_phone() {
        let loc: Location = serde_json::from_value(json!({
            "pk_location": 1,
            "name": "Norte",
            "street_name": "Calle Reforma",
            "phone_number": "8181234567"
        }))
        .unwrap();

        assert!(loc.matches("reforma"));
        assert!(loc.matches("1234"));
        assert!(!loc.matches("sur"));
    }
}
