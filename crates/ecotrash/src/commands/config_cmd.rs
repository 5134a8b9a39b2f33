//! Config subcommand handlers.

use dialoguer::{Input, Select};
use secrecy::SecretString;

use ecotrash_core::DEFAULT_API_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// The config as TOML, as it would be saved.
fn as_toml(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("<unrenderable config: {e}>"))
}

/// Copy with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    let mut copy = cfg.clone();
    for profile in copy.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some("****".into());
        }
    }
    copy
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

fn read_secret(label: &str) -> Result<String, CliError> {
    let secret = rpassword::prompt_password(label).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "value cannot be empty".into(),
        });
    }
    Ok(secret)
}

fn parse_flag<T: std::str::FromStr>(
    field: &str,
    value: &str,
    expected: &str,
) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("Ecotrash console configuration");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let api_url: String = Input::new()
                .with_prompt("API URL")
                .default(DEFAULT_API_URL.into())
                .interact_text()
                .map_err(prompt_err)?;
            ecotrash_config::parse_api_url(&api_url)?;

            let email: String = Input::new()
                .with_prompt("Login email")
                .interact_text()
                .map_err(prompt_err)?;

            let choices = &[
                "Store in system keyring (recommended)",
                "Save to config file (plaintext)",
                "Ask at every login",
            ];
            let storage = Select::new()
                .with_prompt("Where to keep the password?")
                .items(choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let password = match storage {
                0 => {
                    let secret = read_secret("Password: ")?;
                    ecotrash_config::store_password(&profile_name, &SecretString::from(secret))?;
                    eprintln!("   ✓ Password stored in system keyring");
                    None
                }
                1 => Some(read_secret("Password: ")?),
                _ => None,
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    api_url,
                    email: Some(email),
                    password,
                    ..Profile::default()
                },
            );
            cfg.default_profile = Some(profile_name.clone());
            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Next: ecotrash login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(
                &global.output,
                &redacted(&cfg),
                as_toml,
                |_| "config".into(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            match key.as_str() {
                "api_url" | "api-url" => {
                    ecotrash_config::parse_api_url(&value)?;
                    profile.api_url = value;
                }
                "email" => profile.email = Some(value),
                "password_env" | "password-env" => profile.password_env = Some(value),
                "insecure" => {
                    profile.insecure = Some(parse_flag("insecure", &value, "'true' or 'false'")?);
                }
                "timeout" => {
                    profile.timeout = Some(parse_flag("timeout", &value, "a number (seconds)")?);
                }
                "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: api_url, email, \
                             password_env, insecure, timeout, ca_cert"
                        ),
                    });
                }
            }

            config::save_config(&cfg)?;
            output::success(global, &format!("Set {key} on profile '{profile_name}'"));
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: ecotrash config init");
            } else {
                for (name, profile) in &cfg.profiles {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}", profile.api_url);
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::success(global, &format!("Default profile set to '{name}'"));
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let secret = read_secret("Password: ")?;
            ecotrash_config::store_password(&profile_name, &SecretString::from(secret))?;
            output::success(
                global,
                &format!("Password stored in system keyring for profile '{profile_name}'"),
            );
            Ok(())
        }
    }
}
