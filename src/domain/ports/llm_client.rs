//! The external LLM collaborator each agent handler consults. Out of scope
//! per §1 ("treated as a `Generate(prompt) -> text` dependency") — specified
//! only at this interface.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LlmError {
    /// Network/IO-level failure reaching the provider — worth a retry.
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("rate limited")]
    RateLimited,
    /// The provider responded but rejected the request (4xx other than
    /// 429) — retrying with the same prompt would fail identically.
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RequestFailed(_) | Self::RateLimited)
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
