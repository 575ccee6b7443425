//! Shared configuration for the skillbridge CLI.
//!
//! TOML profiles, credential resolution (env + plaintext), and
//! translation to `skillbridge_core::SessionConfig`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use skillbridge_core::SessionConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    UnknownProfile { profile: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

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
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
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
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Backend project base URL (e.g., "https://abc.example.co").
    pub backend: String,

    /// The signed-in user's id, used only in filters.
    pub user_id: String,

    /// API key (plaintext — prefer the env var indirection).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Override timeout in seconds.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "skillbridge", "skillbridge").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("skillbridge");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path();

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("SKILLBRIDGE_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Profile selection ───────────────────────────────────────────────

/// Pick a profile by explicit name or the configured default.
pub fn select_profile<'a>(
    config: &'a Config,
    name: Option<&str>,
) -> Result<(String, &'a Profile), ConfigError> {
    let name = name
        .map(str::to_owned)
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    config
        .profiles
        .get(&name)
        .map(|p| (name.clone(), p))
        .ok_or(ConfigError::UnknownProfile { profile: name })
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an API key: env var indirection first, plaintext second.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `SessionConfig` from a profile.
pub fn profile_to_session(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let _: url::Url = profile.backend.parse().map_err(|_| ConfigError::Validation {
        field: "backend".into(),
        reason: format!("invalid URL: {}", profile.backend),
    })?;

    if profile.user_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "user_id".into(),
            reason: "must not be empty".into(),
        });
    }

    let api_key = resolve_api_key(profile, profile_name)?;

    let mut session = SessionConfig::new(profile.backend.clone(), api_key, profile.user_id.clone());
    session.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(session)
}
