//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use skillbridge_config::ConfigError;
use skillbridge_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the backend: {message}")]
    #[diagnostic(
        code(skillbridge::connection_failed),
        help(
            "Check the backend URL in your profile and your network.\n\
             Run: skillbridge config show"
        )
    )]
    ConnectionFailed { message: String },

    // ── Credentials / configuration ──────────────────────────────────
    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(skillbridge::no_credentials),
        help(
            "Add api_key or api_key_env to the profile in your config file,\n\
             or set the SKILLBRIDGE_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(skillbridge::profile_not_found),
        help("Run: skillbridge config profiles to list what is configured.")
    )]
    ProfileNotFound { name: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(skillbridge::no_config),
        help(
            "Create one at {path}, or pass --backend, --api-key,\n\
             and --user-id directly."
        )
    )]
    NoConfig { path: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(skillbridge::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(skillbridge::config))]
    Config { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource} '{identifier}' not found")]
    #[diagnostic(
        code(skillbridge::not_found),
        help("Run: skillbridge {list_command} to see what exists.")
    )]
    NotFound {
        resource: String,
        identifier: String,
        list_command: String,
    },

    #[error("Permission denied: {message}")]
    #[diagnostic(
        code(skillbridge::permission_denied),
        help("The backend's row security rejected this operation for your user.")
    )]
    PermissionDenied { message: String },

    #[error("Conflict: {message}")]
    #[diagnostic(code(skillbridge::conflict))]
    Conflict { message: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Backend error: {message}")]
    #[diagnostic(code(skillbridge::backend))]
    Backend {
        message: String,
        code: Option<String>,
    },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, key } => CliError::NotFound {
                list_command: format!("{entity} list"),
                resource: entity,
                identifier: key,
            },

            CoreError::PermissionDenied { message } => CliError::PermissionDenied { message },

            CoreError::Conflict { message } => CliError::Conflict { message },

            CoreError::FeedSubscribe { message } => CliError::ConnectionFailed { message },

            CoreError::Backend { message, code, .. } => CliError::Backend { message, code },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::TornDown => CliError::Backend {
                message: "operation interrupted by teardown".into(),
                code: None,
            },

            CoreError::LocalInvariant { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound { name: profile },

            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },

            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },

            ConfigError::Io(err) => CliError::Io(err),

            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
