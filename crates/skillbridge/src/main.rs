mod cli;
mod commands;
mod error;
mod output;

use std::time::Duration;

use clap::Parser;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use skillbridge_core::SessionConfig;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a backend session
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global).await,

        cmd => {
            let config = build_session_config(&cli.global)?;
            let session = commands::Session::open(&config)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &session, &cli.global).await;
            session.close();
            result
        }
    }
}

/// Build a `SessionConfig` from the config file, profile, and CLI
/// overrides. A profile is not required if --backend, --api-key, and
/// --user-id supply everything.
fn build_session_config(global: &GlobalOpts) -> Result<SessionConfig, CliError> {
    let cfg = skillbridge_config::load_config_or_default();

    match skillbridge_config::select_profile(&cfg, global.profile.as_deref()) {
        Ok((name, profile)) => {
            let api_key = match global.api_key {
                Some(ref key) => SecretString::from(key.clone()),
                None => skillbridge_config::resolve_api_key(profile, &name)?,
            };
            let backend = global
                .backend
                .clone()
                .unwrap_or_else(|| profile.backend.clone());
            let user_id = global
                .user_id
                .clone()
                .unwrap_or_else(|| profile.user_id.clone());

            let mut session = SessionConfig::new(backend, api_key, user_id);
            session.timeout = Duration::from_secs(
                global
                    .timeout
                    .or(profile.timeout)
                    .unwrap_or(cfg.defaults.timeout),
            );
            Ok(session)
        }

        // No such profile: only an error if the user asked for one by
        // name; otherwise try to assemble a session from flags alone.
        Err(err) => {
            if global.profile.is_some() {
                return Err(err.into());
            }
            session_from_flags(global, cfg.defaults.timeout)
        }
    }
}

fn session_from_flags(global: &GlobalOpts, default_timeout: u64) -> Result<SessionConfig, CliError> {
    let backend = global.backend.clone().ok_or_else(|| CliError::NoConfig {
        path: skillbridge_config::config_path().display().to_string(),
    })?;
    let api_key = global
        .api_key
        .clone()
        .ok_or_else(|| CliError::NoCredentials {
            profile: "default".into(),
        })?;
    let user_id = global.user_id.clone().ok_or_else(|| CliError::Validation {
        field: "user-id".into(),
        reason: "required when no profile is configured".into(),
    })?;

    let mut session = SessionConfig::new(backend, SecretString::from(api_key), user_id);
    session.timeout = Duration::from_secs(global.timeout.unwrap_or(default_timeout));
    Ok(session)
}
