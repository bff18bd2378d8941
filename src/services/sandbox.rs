//! Sandbox Executor (§4.I): materialises files into a temporary workspace,
//! runs them in an ephemeral container, and always tears down both.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::domain::errors::SandboxError;
use crate::domain::models::{
    LintRunResult, RunCommandRequest, RunCommandResult, SandboxConfig, SandboxStatus,
    TestRunResult, TestSummary, WorkspaceFile,
};
use crate::domain::ports::ContainerRuntime;

pub struct SandboxExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    config: SandboxConfig,
}

impl SandboxExecutor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: SandboxConfig) -> Self {
        Self { runtime, config }
    }

    pub async fn run_command(&self, request: RunCommandRequest) -> Result<RunCommandResult, SandboxError> {
        let workspace = Workspace::materialise(&request.files)?;
        let env: HashMap<String, String> = request.env.into_iter().collect();
        let timeout = request.timeout.unwrap_or(Duration::from_secs(self.config.default_timeout_sec));

        let handle = self
            .runtime
            .create(
                &self.config.image,
                workspace.path(),
                &request.command,
                &env,
                self.config.memory_limit_mb,
                self.config.cpu_quota_millis,
            )
            .await?;

        let run_result = self.runtime.wait(&handle, timeout).await;

        if let Err(err) = self.runtime.remove(&handle).await {
            warn!(error = %err, "failed to remove sandbox container");
        }

        let (stdout, stderr, exit_code, timed_out) = run_result?;
        let stderr = if timed_out && !stderr.to_lowercase().contains("timeout") {
            format!("{stderr}\nsandbox: command killed after exceeding timeout")
        } else {
            stderr
        };

        Ok(RunCommandResult { stdout, stderr, exit_code, duration: timeout, timed_out })
    }

    pub async fn run_python_tests(
        &self,
        test_files: Vec<WorkspaceFile>,
        source_files: Vec<WorkspaceFile>,
        requirements: Vec<String>,
        extra_args: Vec<String>,
    ) -> Result<TestRunResult, SandboxError> {
        let mut files = source_files;
        files.extend(test_files);
        let mut command = vec!["pytest".to_string(), "-v".to_string()];
        command.extend(extra_args);

        let run = self
            .run_command(RunCommandRequest {
                files,
                command,
                timeout: None,
                env: Vec::new(),
                requirements,
            })
            .await?;
        let summary = parse_pytest_summary(&run.stdout);
        Ok(TestRunResult { run, summary })
    }

    pub async fn run_javascript_tests(
        &self,
        test_files: Vec<WorkspaceFile>,
        source_files: Vec<WorkspaceFile>,
        package_manifest: Option<WorkspaceFile>,
        test_command: Vec<String>,
    ) -> Result<TestRunResult, SandboxError> {
        let mut files = source_files;
        files.extend(test_files);
        if let Some(manifest) = package_manifest {
            files.push(manifest);
        }
        let command = if test_command.is_empty() {
            vec!["npm".to_string(), "test".to_string()]
        } else {
            test_command
        };

        let run = self
            .run_command(RunCommandRequest { files, command, timeout: None, env: Vec::new(), requirements: Vec::new() })
            .await?;
        let summary = parse_js_test_summary(&run.stdout);
        Ok(TestRunResult { run, summary })
    }

    pub async fn run_linter(
        &self,
        files: Vec<WorkspaceFile>,
        linter: String,
        extra_args: Vec<String>,
    ) -> Result<LintRunResult, SandboxError> {
        let mut command = vec![linter];
        command.extend(extra_args);
        let run = self
            .run_command(RunCommandRequest { files, command, timeout: None, env: Vec::new(), requirements: Vec::new() })
            .await?;
        Ok(LintRunResult { run })
    }

    pub async fn status(&self) -> SandboxStatus {
        let container_runtime_ok = self.runtime.ping().await;
        let image_ready = container_runtime_ok && self.runtime.image_ready(&self.config.image).await;
        SandboxStatus {
            container_runtime_ok,
            image_ready,
            memory_limit_mb: self.config.memory_limit_mb,
            cpu_quota_millis: self.config.cpu_quota_millis,
        }
    }
}

/// RAII temp workspace directory: files are written on construction and the
/// directory is removed on drop, regardless of the caller's success path.
struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn materialise(files: &[WorkspaceFile]) -> Result<Self, SandboxError> {
        let dir = tempfile::tempdir().map_err(|e| SandboxError::WorkspaceIo(e.to_string()))?;
        for file in files {
            let target = dir.path().join(&file.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SandboxError::WorkspaceIo(e.to_string()))?;
            }
            std::fs::write(&target, &file.contents).map_err(|e| SandboxError::WorkspaceIo(e.to_string()))?;
        }
        Ok(Self { dir })
    }

    fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

/// Parses pytest's summary line, e.g. `"3 passed, 1 failed in 0.42s"`, plus
/// an optional `"TOTAL ... 87%"` coverage line. Returns `None` if no summary
/// line is found (caller reports exit code only).
pub fn parse_pytest_summary(stdout: &str) -> Option<TestSummary> {
    let summary_line = stdout
        .lines()
        .rev()
        .find(|line| line.contains("passed") || line.contains("failed") || line.contains("error"))?;

    let mut summary = TestSummary::default();
    let words: Vec<&str> = summary_line.split_whitespace().collect();
    for pair in words.windows(2) {
        let Ok(n) = pair[0].parse::<u32>() else { continue };
        match pair[1].trim_start_matches(|c: char| !c.is_ascii_alphabetic()) {
            label if label.starts_with("passed") => summary.passed = n,
            label if label.starts_with("failed") => summary.failed = n,
            label if label.starts_with("skipped") => summary.skipped = n,
            label if label.starts_with("error") => summary.errors = n,
            _ => {}
        }
    }

    summary.coverage_percent = stdout
        .lines()
        .find(|line| line.trim_start().starts_with("TOTAL"))
        .and_then(|line| line.split_whitespace().last())
        .and_then(|pct| pct.trim_end_matches('%').parse::<f64>().ok());

    Some(summary)
}

/// Parses a jest-style summary, e.g. `"Tests: 1 failed, 4 passed, 5 total"`.
pub fn parse_js_test_summary(stdout: &str) -> Option<TestSummary> {
    let summary_line = stdout.lines().find(|line| line.trim_start().starts_with("Tests:"))?;

    let mut summary = TestSummary::default();
    for token in summary_line.trim_start_matches("Tests:").split(',') {
        let token = token.trim();
        if let Some(n) = extract_count(token, "passed") {
            summary.passed = n;
        } else if let Some(n) = extract_count(token, "failed") {
            summary.failed = n;
        } else if let Some(n) = extract_count(token, "skipped") {
            summary.skipped = n;
        }
    }
    Some(summary)
}

fn extract_count(token: &str, label: &str) -> Option<u32> {
    if !token.ends_with(label) {
        return None;
    }
    token.trim_end_matches(label).split_whitespace().last()?.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::container::fake_runtime::{FakeOutcome, FakeRuntime};

    fn executor(runtime: FakeRuntime) -> SandboxExecutor {
        SandboxExecutor::new(Arc::new(runtime), SandboxConfig::default())
    }

    #[tokio::test]
    async fn run_command_reports_exit_code_and_tears_down() {
        let runtime = FakeRuntime::new();
        runtime.push_outcome(FakeOutcome { stdout: "hi".to_string(), exit_code: 0, ..Default::default() });
        let executor = executor(runtime);

        let result = executor
            .run_command(RunCommandRequest {
                files: vec![WorkspaceFile { path: "a.txt".to_string(), contents: "x".to_string() }],
                command: vec!["true".to_string()],
                timeout: None,
                env: Vec::new(),
                requirements: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hi");
    }

    #[tokio::test]
    async fn timed_out_run_annotates_stderr() {
        let runtime = FakeRuntime::new();
        runtime.push_outcome(FakeOutcome { exit_code: 124, timed_out: true, ..Default::default() });
        let executor = executor(runtime);

        let result = executor
            .run_command(RunCommandRequest {
                files: Vec::new(),
                command: vec!["sleep".to_string(), "9999".to_string()],
                timeout: Some(Duration::from_secs(2)),
                env: Vec::new(),
                requirements: Vec::new(),
            })
            .await
            .unwrap();
        assert!(result.timed_out);
        assert!(result.stderr.to_lowercase().contains("timeout"));
    }

    #[tokio::test]
    async fn status_reports_unreachable_runtime() {
        let mut runtime = FakeRuntime::new();
        runtime.ping_ok = false;
        let executor = executor(runtime);
        let status = executor.status().await;
        assert!(!status.container_runtime_ok);
        assert!(!status.image_ready);
    }

    #[test]
    fn pytest_summary_parses_passed_and_failed() {
        let stdout = "====== 3 passed, 1 failed in 0.42s ======";
        let summary = parse_pytest_summary(stdout).unwrap();
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn pytest_summary_parses_coverage() {
        let stdout = "1 passed in 0.1s\nTOTAL                 50     5    90%\n";
        let summary = parse_pytest_summary(stdout).unwrap();
        assert_eq!(summary.coverage_percent, Some(90.0));
    }

    #[test]
    fn js_summary_parses_tests_line() {
        let stdout = "Tests: 1 failed, 4 passed, 5 total";
        let summary = parse_js_test_summary(stdout).unwrap();
        assert_eq!(summary.passed, 4);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn unparseable_output_returns_none() {
        assert!(parse_pytest_summary("no recognizable output").is_none());
    }
}
