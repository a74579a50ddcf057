use chrono::Utc;

use crate::cli::CacheCommands;
use crate::commands::common::{format_age, Context};
use crate::error::CliError;

pub async fn run_cache(ctx: &Context, command: CacheCommands) -> Result<(), CliError> {
    let cache = ctx.cache(ctx.open_store()?);

    match command {
        CacheCommands::Show { json } => {
            let snapshot = cache.read().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }

            let synced = snapshot
                .last_synced
                .map_or_else(|| "never".to_string(), |at| format_age(at, Utc::now()));
            println!("Last synced:      {synced}");
            println!("Tasks:            {}", snapshot.tasks.len());
            println!("Messages:         {}", snapshot.messages.len());
            println!("Shifts:           {}", snapshot.shifts.len());
            println!("Temperature logs: {}", snapshot.temperature_logs.len());
        }
        CacheCommands::Clear => {
            cache.clear().await?;
            println!("Offline cache cleared");
        }
    }
    Ok(())
}
