//! In-memory `ContainerRuntime` fake for tests: no Docker socket required.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::errors::SandboxError;
use crate::domain::ports::{ContainerHandle, ContainerRuntime};

/// Canned response for the next `wait()` call, keyed by nothing in
/// particular — tests queue one result per expected container run.
#[derive(Clone, Default)]
pub struct FakeOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

pub struct FakeRuntime {
    next_id: AtomicU64,
    outcomes: Mutex<Vec<FakeOutcome>>,
    pub ping_ok: bool,
    pub image_ready: bool,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            outcomes: Mutex::new(Vec::new()),
            ping_ok: true,
            image_ready: true,
        }
    }

    /// Queues the outcome returned by the next `wait()` call (FIFO).
    pub fn push_outcome(&self, outcome: FakeOutcome) {
        self.outcomes.lock().unwrap().push(outcome);
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> bool {
        self.ping_ok
    }

    async fn image_ready(&self, _image: &str) -> bool {
        self.image_ready
    }

    async fn create(
        &self,
        _image: &str,
        _workspace_dir: &Path,
        _command: &[String],
        _env: &HashMap<String, String>,
        _memory_limit_mb: u64,
        _cpu_quota_millis: u64,
    ) -> Result<ContainerHandle, SandboxError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(ContainerHandle { id: format!("fake-{id}") })
    }

    async fn wait(
        &self,
        _handle: &ContainerHandle,
        _timeout: Duration,
    ) -> Result<(String, String, i32, bool), SandboxError> {
        let outcome = {
            let mut outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                FakeOutcome::default()
            } else {
                outcomes.remove(0)
            }
        };
        Ok((outcome.stdout, outcome.stderr, outcome.exit_code, outcome.timed_out))
    }

    async fn remove(&self, _handle: &ContainerHandle) -> Result<(), SandboxError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_outcomes_are_returned_in_order() {
        let runtime = FakeRuntime::new();
        runtime.push_outcome(FakeOutcome { exit_code: 0, ..Default::default() });
        runtime.push_outcome(FakeOutcome { exit_code: 1, ..Default::default() });

        let handle = runtime
            .create("img", Path::new("/tmp"), &[], &HashMap::new(), 512, 500)
            .await
            .unwrap();
        let (_, _, first, _) = runtime.wait(&handle, Duration::from_secs(1)).await.unwrap();
        let (_, _, second, _) = runtime.wait(&handle, Duration::from_secs(1)).await.unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, 1);
    }
}
