use std::fmt;

use ecotrash_api::LoginData;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Console role. Drives which screens a user may open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
    Management,
    Collector,
    #[serde(other)]
    Unknown,
}

/// The authenticated user, persisted between runs.
///
/// The access token is kept as a [`SecretString`] and never printed by
/// `Debug`; it is written in clear only to the session file.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub management_id: Option<i64>,
    #[serde(serialize_with = "expose_token", deserialize_with = "secret_token")]
    pub token: SecretString,
}

impl CurrentUser {
    /// Build the session record from a successful login response.
    pub fn from_login(data: LoginData) -> Self {
        Self {
            id: data.user.pk,
            role: data.user.role.parse().unwrap_or(Role::Unknown),
            username: data.user.username,
            name: data.user.full_name,
            email: data.user.email,
            management_id: data.management.map(|m| m.pk_management),
            token: SecretString::from(data.access_token),
        }
    }

    /// Name shown in the console header: full name, else username.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("management_id", &self.management_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

fn expose_token<S: Serializer>(token: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(token.expose_secret())
}

fn secret_token<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}
