use crate::cli::QueueCommands;
use crate::commands::common::{format_action_lines, Context};
use crate::error::CliError;

pub async fn run_queue(ctx: &Context, command: QueueCommands) -> Result<(), CliError> {
    let queue = ctx.queue(ctx.open_store()?);

    match command {
        QueueCommands::List { json } => {
            let actions = queue.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&actions)?);
            } else if actions.is_empty() {
                println!("No queued changes.");
            } else {
                for line in format_action_lines(&actions) {
                    println!("{line}");
                }
            }
        }
        QueueCommands::Clear => {
            let count = queue.pending_count().await?;
            queue.clear().await?;
            println!("Dropped {count} queued changes");
        }
        QueueCommands::DeadLetters { json } => {
            let letters = queue.dead_letters().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&letters)?);
            } else if letters.is_empty() {
                println!("No dead-lettered changes.");
            } else {
                for line in format_action_lines(&letters) {
                    println!("{line}");
                }
            }
        }
        QueueCommands::RetryDead => {
            let count = queue.retry_dead_letters().await?;
            println!("Requeued {count} dead-lettered changes");
        }
    }
    Ok(())
}
