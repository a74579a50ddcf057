use pattyshack_core::offline::is_placeholder_id;
use serde_json::Value;

use crate::commands::common::{parse_object, Context};
use crate::error::CliError;

pub async fn run_insert(ctx: &Context, table: &str, data: &str) -> Result<(), CliError> {
    let record = parse_object(data)?;
    let operations = ctx.operations(ctx.open_store()?)?;

    let result = operations.insert(table, record).await?;
    if let Some(id) = result.get("id").and_then(Value::as_str) {
        if is_placeholder_id(id) {
            eprintln!("Offline: insert queued, {id} will be replaced by the server id on sync");
        }
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn run_update(ctx: &Context, table: &str, id: &str, data: &str) -> Result<(), CliError> {
    let updates = parse_object(data)?;
    let operations = ctx.operations(ctx.open_store()?)?;
    let online = operations.is_online().await;

    let result = operations.update(table, id, updates).await?;
    if !online {
        eprintln!("Offline: update queued");
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn run_delete(ctx: &Context, table: &str, id: &str) -> Result<(), CliError> {
    let operations = ctx.operations(ctx.open_store()?)?;
    let online = operations.is_online().await;

    operations.delete(table, id).await?;
    if online {
        println!("Deleted {table} {id}");
    } else {
        println!("Offline: delete of {table} {id} queued");
    }
    Ok(())
}
