//! Patty - command-line front end for the Pattyshack Ops offline layer
//!
//! Queue changes while offline, inspect what is pending, and replay it
//! against Supabase once the connection is back.

mod cli;
mod commands;
mod config_file;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::cache::run_cache;
use crate::commands::common::Context;
use crate::commands::config::run_config;
use crate::commands::mutate::{run_delete, run_insert, run_update};
use crate::commands::queue::run_queue;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pattyshack=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::load(cli.db_path, cli.config)?;

    match cli.command {
        Commands::Status { json } => run_status(&ctx, json).await?,
        Commands::Queue { command } => run_queue(&ctx, command).await?,
        Commands::Sync => run_sync(&ctx).await?,
        Commands::Insert { table, data } => run_insert(&ctx, &table, &data).await?,
        Commands::Update { table, id, data } => run_update(&ctx, &table, &id, &data).await?,
        Commands::Delete { table, id } => run_delete(&ctx, &table, &id).await?,
        Commands::Cache { command } => run_cache(&ctx, command).await?,
        Commands::Config { command } => run_config(&ctx, command)?,
    }

    Ok(())
}
