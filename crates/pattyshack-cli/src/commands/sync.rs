use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_sync(ctx: &Context) -> Result<(), CliError> {
    let operations = ctx.operations(ctx.open_store()?)?;

    if !operations.is_online().await {
        let pending = operations.queue().pending_count().await?;
        println!("Offline: {pending} changes remain queued");
        return Ok(());
    }

    let report = operations.sync().await?;
    println!(
        "Sync completed: {} succeeded, {} failed, {} dead-lettered",
        report.success, report.failed, report.dead_lettered
    );
    for mapping in &report.id_mappings {
        println!("  {} -> {}", mapping.placeholder, mapping.server_id);
    }
    Ok(())
}
