//! CLI configuration: thin wrapper around `ecotrash_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --insecure, --timeout).

use std::time::Duration;

use ecotrash_core::{ApiConfig, TlsMode};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use ecotrash_config::{
    Config, Profile, config_path, load_config_or_default, profile_to_api_config, save_config,
};

/// Active profile plus the API configuration built from it.
pub struct Resolved {
    pub profile_name: String,
    pub profile: Profile,
    pub api: ApiConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Build the API configuration from config file, profile and flags.
///
/// Without a stored profile, `--api-url` alone is enough.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None if global.api_url.is_some() => Profile::default(),
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }

    let mut api = profile_to_api_config(&profile, &profile_name, &cfg.defaults)?;
    if global.insecure {
        api.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        api.timeout = Duration::from_secs(secs);
    }

    Ok(Resolved {
        profile_name,
        profile,
        api,
    })
}
