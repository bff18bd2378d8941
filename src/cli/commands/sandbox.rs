//! `catalyst sandbox run|status`: local debugging access to the sandbox executor.

use anyhow::Result;
use clap::Subcommand;

use crate::composition::Composition;
use crate::domain::models::RunCommandRequest;
use crate::infrastructure::config::ConfigLoader;
use crate::services::EnvironmentDetector;

#[derive(Subcommand, Debug)]
pub enum SandboxCommand {
    /// Run a shell command in an ephemeral sandbox container.
    Run {
        command: Vec<String>,
        #[arg(long)]
        timeout_sec: Option<u64>,
    },
    /// Report container-runtime and sandbox-image health.
    Status,
}

pub async fn run(command: SandboxCommand) -> Result<()> {
    let config = ConfigLoader::load(EnvironmentDetector::detect())?;
    let composition = Composition::build(config).await?;

    match command {
        SandboxCommand::Run { command, timeout_sec } => {
            let result = composition
                .sandbox
                .run_command(RunCommandRequest {
                    files: Vec::new(),
                    command,
                    timeout: timeout_sec.map(std::time::Duration::from_secs),
                    env: Vec::new(),
                    requirements: Vec::new(),
                })
                .await?;
            println!("{}", result.stdout);
            if !result.stderr.is_empty() {
                eprintln!("{}", result.stderr);
            }
            std::process::exit(result.exit_code);
        }
        SandboxCommand::Status => {
            let status = composition.sandbox.status().await;
            println!(
                "container_runtime_ok={} image_ready={} memory_limit_mb={} cpu_quota_millis={}",
                status.container_runtime_ok, status.image_ready, status.memory_limit_mb, status.cpu_quota_millis
            );
        }
    }
    Ok(())
}
