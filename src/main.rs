use anyhow::Result;
use clap::Parser;

use catalyst::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => catalyst::cli::commands::serve::run(args).await,
        Commands::Task { command } => catalyst::cli::commands::task::run(command).await,
        Commands::Sandbox { command } => catalyst::cli::commands::sandbox::run(command).await,
    }
}
