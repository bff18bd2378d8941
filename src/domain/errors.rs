//! Domain error types for Catalyst, one enum per failing component, each
//! exposing `is_transient`/`is_permanent` so callers (notably the Consumer's
//! retry policy) can dispatch on kind rather than string-matching.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("failed to connect to broker after {attempts} attempts: {reason}")]
    ConnectFailed { attempts: u32, reason: String },
    #[error("topology declaration mismatch for {resource}: {detail}")]
    ArgumentMismatch { resource: String, detail: String },
    #[error("amqp error: {0}")]
    Amqp(String),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("connection-family error, exhausted {attempts} retries: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },
    #[error("amqp error: {0}")]
    Amqp(String),
    #[error("payload serialization failed: {0}")]
    Serialization(String),
}

impl PublishError {
    /// Connection-reset family: reconnect and retry with backoff rather than failing fast.
    pub fn is_connection_family(message: &str) -> bool {
        let m = message.to_lowercase();
        ["connection reset", "stream lost", "broker-closed", "amqp connection error"]
            .iter()
            .any(|needle| m.contains(needle))
    }
}

#[derive(Error, Debug)]
pub enum ConsumeError {
    #[error("connection-family error: {0}")]
    ConnectionFamily(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("container execution failed: {0}")]
    ExecutionFailed(String),
    #[error("workspace materialisation failed: {0}")]
    WorkspaceIo(String),
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("topology initialisation failed: {0}")]
    TopologyInit(#[from] TopologyError),
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("stage {stage} failed: {reason}")]
    StageFailed { stage: String, reason: String },
}

/// Top-level error surfaced by the HTTP edge.
#[derive(Error, Debug)]
pub enum CatalystError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_family_matches_known_messages() {
        assert!(PublishError::is_connection_family("Connection reset by peer"));
        assert!(PublishError::is_connection_family("AMQP connection error: eof"));
        assert!(!PublishError::is_connection_family("malformed payload"));
    }
}
