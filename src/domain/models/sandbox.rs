//! Data shapes for the Sandbox Executor's public operations (§4.I).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single file to materialise into the ephemeral workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceFile {
    /// Path relative to `/workspace` inside the container.
    pub path: String,
    pub contents: String,
}

/// Request shape for `RunCommand`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCommandRequest {
    pub files: Vec<WorkspaceFile>,
    pub command: Vec<String>,
    pub timeout: Option<Duration>,
    pub env: Vec<(String, String)>,
    pub requirements: Vec<String>,
}

/// Result of any sandbox invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
    pub timed_out: bool,
}

/// Parsed pytest/jest-style summary, attached to test runs when parseable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TestSummary {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub errors: u32,
    pub coverage_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunResult {
    pub run: RunCommandResult,
    pub summary: Option<TestSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintRunResult {
    pub run: RunCommandResult,
}

/// `Status()` response for `/api/sandbox/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxStatus {
    pub container_runtime_ok: bool,
    pub image_ready: bool,
    pub memory_limit_mb: u64,
    pub cpu_quota_millis: u64,
}
