//! `catalyst task submit|show|logs`.

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::Table;
use uuid::Uuid;

use crate::composition::Composition;
use crate::infrastructure::config::ConfigLoader;
use crate::services::EnvironmentDetector;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Submit a new task to the pipeline.
    Submit { prompt: String },
    /// Show a task's current status and phase.
    Show { task_id: Uuid },
    /// Print the ordered audit trail for a task.
    Logs { task_id: Uuid },
}

pub async fn run(command: TaskCommand) -> Result<()> {
    let config = ConfigLoader::load(EnvironmentDetector::detect())?;
    let composition = Composition::build(config).await?;

    match command {
        TaskCommand::Submit { prompt } => {
            let task_id = composition.orchestrator.execute_task(prompt).await?;
            println!("{task_id}");
        }
        TaskCommand::Show { task_id } => {
            let task = composition.store.get_task(task_id).await?.context("task not found")?;
            let mut table = Table::new();
            table.set_header(vec!["task_id", "status", "current_phase", "updated_at"]);
            table.add_row(vec![
                task.task_id.to_string(),
                task.status.as_str().to_string(),
                task.current_phase.map_or_else(|| "-".to_string(), |p| p.to_string()),
                task.updated_at.to_rfc3339(),
            ]);
            println!("{table}");
        }
        TaskCommand::Logs { task_id } => {
            let history = composition.store.load_task_history(task_id).await?;
            let mut table = Table::new();
            table.set_header(vec!["timestamp", "event_type", "actor"]);
            for entry in history {
                table.add_row(vec![entry.timestamp.to_rfc3339(), entry.event_type.to_string(), entry.actor]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
