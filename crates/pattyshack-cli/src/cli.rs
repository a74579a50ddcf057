use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "patty")]
#[command(about = "Inspect and sync the Pattyshack Ops offline queue")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local offline database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to the CLI config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show connectivity, pending changes and cache freshness
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or manage queued offline changes
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Replay queued changes against Supabase now
    Sync,
    /// Insert a record (queued when offline)
    Insert {
        /// Target table
        table: String,
        /// Record as a JSON object
        data: String,
    },
    /// Update a record (queued when offline)
    Update {
        /// Target table
        table: String,
        /// Record id, or a placeholder id from an offline insert
        id: String,
        /// Changed fields as a JSON object
        data: String,
    },
    /// Delete a record (queued when offline)
    Delete {
        /// Target table
        table: String,
        /// Record id, or a placeholder id from an offline insert
        id: String,
    },
    /// Inspect or clear the offline snapshot cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Configure the Supabase project
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List queued changes in replay order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop every queued change
    Clear,
    /// List changes that exhausted their retries
    DeadLetters {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move dead-lettered changes back into the queue
    RetryDead,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show the cached snapshot
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the cached snapshot
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the config file
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Access token of the signed-in user
        #[arg(long, value_name = "TOKEN")]
        access_token: Option<String>,
    },
    /// Print the effective configuration (secrets redacted)
    Show,
}
