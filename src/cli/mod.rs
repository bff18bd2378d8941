//! CLI edge: `catalyst serve` bootstraps topology plus workers
//! plus the HTTP surface; `catalyst task`/`sandbox` give local debugging
//! access to the same operations the REST surface exposes.

pub mod commands;

use clap::{Parser, Subcommand};

use commands::{sandbox::SandboxCommand, serve::ServeArgs, task::TaskCommand};

#[derive(Parser, Debug)]
#[command(name = "catalyst", about = "Event-driven multi-agent software-delivery orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap topology, start all agent workers, and serve the REST API.
    Serve(ServeArgs),
    /// Submit, inspect, or trail a task.
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    /// Run or inspect the sandbox directly, bypassing the pipeline.
    Sandbox {
        #[command(subcommand)]
        command: SandboxCommand,
    },
}
