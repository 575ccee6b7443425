//! Configuration command handlers. These never open a backend session.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;

use skillbridge_config::{config_path, load_config_or_default, save_config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ProfileSummary {
    name: String,
    backend: String,
    user_id: String,
    default: bool,
    key_source: String,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "PROFILE")]
    name: String,
    #[tabled(rename = "BACKEND")]
    backend: String,
    #[tabled(rename = "USER")]
    user_id: String,
    #[tabled(rename = "KEY")]
    key_source: String,
    #[tabled(rename = "DEFAULT")]
    default: String,
}

fn to_row(p: &ProfileSummary) -> ProfileRow {
    ProfileRow {
        name: p.name.clone(),
        backend: p.backend.clone(),
        user_id: p.user_id.clone(),
        key_source: p.key_source.clone(),
        default: if p.default { "*".into() } else { String::new() },
    }
}

pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = load_config_or_default();
            let summaries = summarize(&cfg);
            let rendered = output::render_single(
                &global.output,
                &summaries,
                |_| format_show(&cfg, &summaries),
                |_| config_path().display().to_string(),
            );
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = load_config_or_default();
            let summaries = summarize(&cfg);
            let rendered =
                output::render_list(&global.output, &summaries, to_row, |p| p.name.clone());
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound { name });
            }
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config_path().display());
            Ok(())
        }
    }
}

/// Profile summaries with credentials reduced to their source, never
/// their value.
fn summarize(cfg: &Config) -> Vec<ProfileSummary> {
    let default = cfg.default_profile.as_deref();
    let mut summaries: Vec<ProfileSummary> = cfg
        .profiles
        .iter()
        .map(|(name, profile)| ProfileSummary {
            name: name.clone(),
            backend: profile.backend.clone(),
            user_id: profile.user_id.clone(),
            default: default == Some(name.as_str()),
            key_source: match (&profile.api_key_env, &profile.api_key) {
                (Some(env), _) => format!("env:{env}"),
                (None, Some(_)) => "plaintext".into(),
                (None, None) => "-".into(),
            },
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    summaries
}

fn format_show(cfg: &Config, summaries: &[ProfileSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "config file:     {}", config_path().display());
    let _ = writeln!(
        out,
        "default profile: {}",
        cfg.default_profile.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(
        out,
        "defaults:        output={} color={} timeout={}s",
        cfg.defaults.output, cfg.defaults.color, cfg.defaults.timeout
    );
    for p in summaries {
        let _ = writeln!(
            out,
            "profile {}: backend={} user={} key={}",
            p.name, p.backend, p.user_id, p.key_source
        );
    }
    out.trim_end().to_owned()
}
