use pattyshack_core::config::RemoteConfig;
use serde_json::json;

use crate::cli::ConfigCommands;
use crate::commands::common::Context;
use crate::config_file::{remote_from_vars, CliConfig};
use crate::error::CliError;

pub fn run_config(ctx: &Context, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            access_token,
        } => {
            let updated = init_config(
                &ctx.config,
                RemoteConfig {
                    supabase_url,
                    supabase_anon_key,
                    access_token,
                },
            )?;
            updated
                .save_to_path(&ctx.config_path)
                .map_err(CliError::Config)?;
            println!("Saved config to {}", ctx.config_path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let remote = ctx
                .config
                .effective_remote(remote_from_vars(|name| std::env::var(name).ok()));
            println!("{}", render_config(ctx, &remote)?);
            Ok(())
        }
    }
}

/// Merge explicit values over the existing file and validate the result.
pub fn init_config(existing: &CliConfig, explicit: RemoteConfig) -> Result<CliConfig, CliError> {
    let remote = explicit.normalized().or(existing.remote.clone().normalized());
    if remote.resolve()?.is_none() {
        return Err(CliError::Config(
            "--supabase-url and --supabase-anon-key are required".to_string(),
        ));
    }

    Ok(CliConfig {
        remote,
        ..existing.clone()
    })
}

fn render_config(ctx: &Context, remote: &RemoteConfig) -> Result<String, CliError> {
    let redacted = |value: Option<&String>| value.map(|_| "[REDACTED]");
    let rendered = json!({
        "config_path": ctx.config_path.display().to_string(),
        "db_path": ctx.db_path.display().to_string(),
        "supabase_url": remote.supabase_url,
        "supabase_anon_key": redacted(remote.supabase_anon_key.as_ref()),
        "access_token": redacted(remote.access_token.as_ref()),
        "offline": ctx.config.offline,
    });
    Ok(serde_json::to_string_pretty(&rendered)?)
}
