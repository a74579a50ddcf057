use chrono::{DateTime, Utc};
use pattyshack_core::state::SyncState;
use serde::Serialize;

use crate::commands::common::{format_age, Context};
use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    /// `None` when no Supabase project is configured
    pub online: Option<bool>,
    pub pending: usize,
    pub dead_lettered: usize,
    pub last_synced: Option<DateTime<Utc>>,
    pub sync_state: Option<&'static str>,
}

pub async fn collect_status(ctx: &Context) -> Result<StatusReport, CliError> {
    let store = ctx.open_store()?;
    let queue = ctx.queue(store.clone());
    let pending = queue.pending_count().await?;
    let dead_lettered = queue.dead_letters().await?.len();
    let last_synced = ctx.cache(store.clone()).read().await?.last_synced;

    let online = match ctx.operations(store) {
        Ok(operations) => Some(operations.is_online().await),
        Err(CliError::NotConfigured) => None,
        Err(error) => return Err(error),
    };

    Ok(StatusReport {
        online,
        pending,
        dead_lettered,
        last_synced,
        sync_state: online.map(|online| SyncState::derive(online, pending, dead_lettered).label()),
    })
}

pub async fn run_status(ctx: &Context, as_json: bool) -> Result<(), CliError> {
    let report = collect_status(ctx).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let connectivity = match report.online {
        Some(true) => "online",
        Some(false) => "offline",
        None => "not configured",
    };
    println!("Connectivity: {connectivity}");
    if let Some(state) = report.sync_state {
        println!("Sync state:   {state}");
    }
    println!("Pending:      {}", report.pending);
    println!("Dead letters: {}", report.dead_lettered);
    match report.last_synced {
        Some(at) => println!("Last synced:  {}", format_age(at, Utc::now())),
        None => println!("Last synced:  never"),
    }
    Ok(())
}
