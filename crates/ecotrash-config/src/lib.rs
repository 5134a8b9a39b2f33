//! Console configuration for Ecotrash.
//!
//! TOML profiles, password resolution (env + keyring + plaintext), the
//! file-backed session store, and translation to
//! `ecotrash_core::ApiConfig`. The CLI layers its flag overrides on top.

mod session;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ecotrash_core::{ApiConfig, Credentials, DEFAULT_API_URL, TlsMode};

pub use session::{FileSessionStore, SESSION_KEY};

/// Service name used for keyring entries.
const KEYRING_SERVICE: &str = "ecotrash";

/// Process-wide password override.
pub const PASSWORD_ENV: &str = "ECOTRASH_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Name of the active profile: explicit choice, else the configured
    /// default, else `"default"`.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API base URL, e.g. `http://localhost:8000/api/v1/`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Login email.
    pub email: Option<String>,

    /// Password in plaintext. Prefer the keyring or an env var.
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    pub password_env: Option<String>,

    /// PEM CA bundle for self-hosted backends.
    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            email: None,
            password: None,
            password_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "ecotrash", "ecotrash")
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("ecotrash");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding the persisted session record.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load the config from the canonical path plus `ECOTRASH_` variables.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path`, layered as defaults < file < env.
/// Nested keys use a double underscore: `ECOTRASH_DEFAULTS__OUTPUT`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ECOTRASH_").split("__").ignore(&["password"]));

    Ok(figment.extract()?)
}

/// Load config, returning a default when loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize to TOML at the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

fn keyring_password(profile_name: &str) -> Option<String> {
    keyring_entry(profile_name).ok()?.get_password().ok()
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    use secrecy::ExposeSecret;

    keyring_entry(profile_name)?
        .set_password(password.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve the login password for a profile.
///
/// Order: the variable named by `password_env`, then `ECOTRASH_PASSWORD`,
/// then the system keyring, then the plaintext `password` field.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        keyring_password,
    )
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    profile
        .password_env
        .as_deref()
        .and_then(&env)
        .or_else(|| env(PASSWORD_ENV))
        .or_else(|| keyring(profile_name))
        .or_else(|| profile.password.clone())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Build an `ApiConfig` from a profile, no CLI overrides.
///
/// Credentials are attached only when the profile names an email and a
/// password resolves; token sessions work without them.
pub fn profile_to_api_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ApiConfig, ConfigError> {
    let base_url = parse_api_url(&profile.api_url)?;

    let credentials = match &profile.email {
        Some(email) => resolve_password(profile, profile_name)
            .ok()
            .map(|password| Credentials {
                email: email.clone(),
                password,
            }),
        None => None,
    };

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    let mut config = ApiConfig::new(base_url);
    config.credentials = credentials;
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(config)
}

/// Parse an API base URL, forcing the trailing slash relative joins need.
pub fn parse_api_url(raw: &str) -> Result<url::Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    normalized.parse().map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {raw}"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn no_source(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn password_env_wins_over_everything() {
        let profile = Profile {
            password_env: Some("MY_PW".into()),
            password: Some("plain".into()),
            ..Profile::default()
        };
        let env = |name: &str| match name {
            "MY_PW" => Some("from-named".to_owned()),
            PASSWORD_ENV => Some("from-global".to_owned()),
            _ => None,
        };
        let pw = resolve_password_with(&profile, "default", env, |_| Some("kr".into())).unwrap();
        assert_eq!(pw.expose_secret(), "from-named");
    }

    #[test]
    fn keyring_before_plaintext() {
        let profile = Profile {
            password: Some("plain".into()),
            ..Profile::default()
        };
        let pw = resolve_password_with(&profile, "work", no_source, |name| {
            (name == "work").then(|| "from-keyring".to_owned())
        })
        .unwrap();
        assert_eq!(pw.expose_secret(), "from-keyring");

        let pw = resolve_password_with(&profile, "work", no_source, no_source).unwrap();
        assert_eq!(pw.expose_secret(), "plain");
    }

    #[test]
    fn missing_password_names_the_profile() {
        let err = resolve_password_with(&Profile::default(), "ops", no_source, no_source)
            .unwrap_err();
        assert_eq!(err.to_string(), "no credentials configured for profile 'ops'");
    }

    #[test]
    fn api_url_gets_trailing_slash() {
        let url = parse_api_url("http://backend:8000/api/v1").unwrap();
        assert_eq!(url.as_str(), "http://backend:8000/api/v1/");
        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn profile_overrides_defaults() {
        let profile = Profile {
            api_url: "https://eco.example.com/api/v1/".into(),
            insecure: Some(true),
            timeout: Some(5),
            ..Profile::default()
        };
        let cfg = profile_to_api_config(&profile, "default", &Defaults::default()).unwrap();
        assert_eq!(cfg.tls, TlsMode::DangerAcceptInvalid);
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert!(cfg.credentials.is_none());
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                email: Some("ana@example.com".into()),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        let profile = loaded.profile("default").unwrap();
        assert_eq!(profile.email.as_deref(), Some("ana@example.com"));
        assert_eq!(profile.api_url, DEFAULT_API_URL);
        assert_eq!(loaded.profile_name(None), "default");
        assert!(matches!(
            loaded.profile("missing"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }
}
