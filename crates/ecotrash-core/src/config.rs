// ── Runtime API configuration ──
//
// Describes *how* to reach the backend. Carries credential data and
// transport tuning but never touches disk; the console builds an
// `ApiConfig` from its profile and hands it in.

use std::time::Duration;

use ecotrash_api::{ApiClient, TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// Default backend location for a development server.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1/";

/// Email + password used for token login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

/// Configuration for talking to one backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API base URL (e.g. `http://localhost:8000/api/v1/`).
    pub base_url: Url,
    /// Login credentials, when the profile has them.
    pub credentials: Option<Credentials>,
    /// TLS verification strategy.
    pub tls: TlsMode,
    /// Request timeout.
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            credentials: None,
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Build the HTTP client described by this configuration.
    pub fn build_client(&self) -> Result<ApiClient, CoreError> {
        let transport = TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        };
        Ok(ApiClient::new(self.base_url.clone(), &transport)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_url_parses() {
        let config = ApiConfig::new(DEFAULT_API_URL.parse().unwrap());
        assert_eq!(config.base_url.path(), "/api/v1/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.credentials.is_none());
    }

    #[test]
    fn builds_client_with_normalized_base() {
        let config = ApiConfig::new("http://localhost:8000/api/v1".parse().unwrap());
        let client = config.build_client().unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/api/v1/");
    }
}
