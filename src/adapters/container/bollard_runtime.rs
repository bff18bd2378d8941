//! `ContainerRuntime` over a real Docker daemon via `bollard`.

use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, LogsOptions, RemoveContainerOptions,
    WaitContainerOptions,
};
use bollard::image::ListImagesOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

use crate::domain::errors::SandboxError;
use crate::domain::ports::{ContainerHandle, ContainerRuntime};

pub struct BollardRuntime {
    docker: Docker,
    network: String,
}

impl BollardRuntime {
    pub fn connect(network: impl Into<String>) -> Result<Self, SandboxError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| SandboxError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self { docker, network: network.into() })
    }
}

#[async_trait]
impl ContainerRuntime for BollardRuntime {
    async fn ping(&self) -> bool {
        self.docker.ping().await.is_ok()
    }

    async fn image_ready(&self, image: &str) -> bool {
        let mut filters = HashMap::new();
        filters.insert("reference".to_string(), vec![image.to_string()]);
        let options = ListImagesOptions { filters, ..Default::default() };
        matches!(self.docker.list_images(Some(options)).await, Ok(images) if !images.is_empty())
    }

    async fn create(
        &self,
        image: &str,
        workspace_dir: &Path,
        command: &[String],
        env: &HashMap<String, String>,
        memory_limit_mb: u64,
        cpu_quota_millis: u64,
    ) -> Result<ContainerHandle, SandboxError> {
        let env: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let binds = vec![format!("{}:/workspace", workspace_dir.display())];

        let host_config = HostConfig {
            binds: Some(binds),
            memory: Some(i64::try_from(memory_limit_mb * 1024 * 1024).unwrap_or(i64::MAX)),
            cpu_quota: Some(i64::try_from(cpu_quota_millis * 1000).unwrap_or(i64::MAX)),
            cpu_period: Some(1_000_000),
            // Shares the application's network (package installs need DNS/
            // outbound access) but never the host's — no `--privileged`,
            // no extra binds beyond the workspace mount above.
            network_mode: Some(self.network.clone()),
            privileged: Some(false),
            ..Default::default()
        };

        let config = ContainerConfig {
            image: Some(image.to_string()),
            cmd: Some(command.to_vec()),
            env: Some(env),
            working_dir: Some("/workspace".to_string()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions { name: "", platform: None };
        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| SandboxError::ExecutionFailed(e.to_string()))?;

        self.docker
            .start_container::<String>(&created.id, None)
            .await
            .map_err(|e| SandboxError::ExecutionFailed(e.to_string()))?;

        Ok(ContainerHandle { id: created.id })
    }

    async fn wait(
        &self,
        handle: &ContainerHandle,
        wait_timeout: Duration,
    ) -> Result<(String, String, i32, bool), SandboxError> {
        let wait_fut = async {
            let mut stream = self.docker.wait_container(
                &handle.id,
                Some(WaitContainerOptions { condition: "not-running" }),
            );
            let mut exit_code = 0;
            while let Some(next) = stream.next().await {
                match next {
                    Ok(response) => exit_code = response.status_code,
                    Err(e) => return Err(SandboxError::ExecutionFailed(e.to_string())),
                }
            }
            Ok(exit_code)
        };

        let (exit_code, timed_out) = if let Ok(result) = timeout(wait_timeout, wait_fut).await {
            (result?, false)
        } else {
            self.docker
                .kill_container::<String>(&handle.id, None)
                .await
                .map_err(|e| SandboxError::ExecutionFailed(e.to_string()))?;
            (124, true)
        };

        let (stdout, stderr) = self.collect_logs(&handle.id).await?;
        let exit_code = i32::try_from(exit_code).unwrap_or(i32::MAX);
        Ok((stdout, stderr, exit_code, timed_out))
    }

    async fn remove(&self, handle: &ContainerHandle) -> Result<(), SandboxError> {
        self.docker
            .remove_container(
                &handle.id,
                Some(RemoveContainerOptions { force: true, ..Default::default() }),
            )
            .await
            .map_err(|e| SandboxError::ExecutionFailed(e.to_string()))?;
        Ok(())
    }
}

impl BollardRuntime {
    async fn collect_logs(&self, container_id: &str) -> Result<(String, String), SandboxError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };
        let mut stream = self.docker.logs(container_id, Some(options));
        let mut stdout = String::new();
        let mut stderr = String::new();
        while let Some(next) = stream.next().await {
            match next {
                Ok(bollard::container::LogOutput::StdOut { message }) => {
                    stdout.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(bollard::container::LogOutput::StdErr { message }) => {
                    stderr.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => return Err(SandboxError::ExecutionFailed(e.to_string())),
            }
        }
        Ok((stdout, stderr))
    }
}
