//! Runtime configuration record produced by the Environment Detector and
//! refined by the config loader (§6.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    EventDriven,
    Sequential,
}

impl Mode {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "event_driven" | "event-driven" => Some(Self::EventDriven),
            "sequential" => Some(Self::Sequential),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Plain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    pub image: String,
    pub memory_limit_mb: u64,
    pub cpu_quota_millis: u64,
    pub default_timeout_sec: u64,
    /// Docker network sandbox containers join — shared with the application
    /// so `pip`/`npm` installs resolve, never the host's own network (§4.I).
    pub network: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "catalyst/sandbox:latest".to_string(),
            memory_limit_mb: 512,
            cpu_quota_millis: 500,
            default_timeout_sec: 300,
            network: "bridge".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            api_key: None,
            model: "claude-sonnet".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mode: Mode,
    pub broker_url: String,
    pub db_url: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub sandbox: SandboxConfig,
    pub llm: LlmConfig,
    /// Whether handlers deduplicate replayed `event_id`s via the audit
    /// store. Open Question in §9: made explicit and configurable here.
    pub dedup_via_audit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Sequential,
            broker_url: "amqp://127.0.0.1:5672/%2f".to_string(),
            db_url: "sqlite:catalyst.db".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Plain,
            sandbox: SandboxConfig::default(),
            llm: LlmConfig::default(),
            dedup_via_audit: true,
        }
    }
}
