//! `ContainerRuntime` port — Design Note: abstract the sandbox's container
//! access behind a trait so tests can swap in a fake that records calls and
//! returns canned output, independent of the actual Docker socket.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::domain::errors::SandboxError;

/// A running ephemeral container handle.
pub struct ContainerHandle {
    pub id: String,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Is the runtime reachable (e.g. the Docker socket responds)?
    async fn ping(&self) -> bool;

    /// Is the configured sandbox image present locally?
    async fn image_ready(&self, image: &str) -> bool;

    /// Launch an ephemeral container from `image`, mounting `workspace_dir`
    /// at `/workspace` as the working directory, with the given resource
    /// caps and environment.
    async fn create(
        &self,
        image: &str,
        workspace_dir: &Path,
        command: &[String],
        env: &HashMap<String, String>,
        memory_limit_mb: u64,
        cpu_quota_millis: u64,
    ) -> Result<ContainerHandle, SandboxError>;

    /// Run the container to completion or until `timeout` elapses, whichever
    /// comes first, returning whatever stdout/stderr/exit code was captured
    /// and whether the container was killed for exceeding `timeout`.
    async fn wait(
        &self,
        handle: &ContainerHandle,
        timeout: Duration,
    ) -> Result<(String, String, i32, bool), SandboxError>;

    /// Always called on both success and failure paths to tear the container down.
    async fn remove(&self, handle: &ContainerHandle) -> Result<(), SandboxError>;
}
