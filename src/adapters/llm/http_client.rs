//! HTTP-backed `LlmClient`, modelled on the Claude API request/response
//! shape. Out of scope beyond the `generate(prompt) -> text` boundary.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::models::LlmConfig;
use crate::domain::ports::{LlmClient, LlmError};

pub struct HttpLlmClient {
    http_client: ReqwestClient,
    api_key: String,
    base_url: String,
    model: String,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http_client = ReqwestClient::builder()
            .timeout(Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: "https://api.anthropic.com".to_string(),
            model: config.model.clone(),
        })
    }

    #[cfg(test)]
    fn with_base_url(config: &LlmConfig, base_url: impl Into<String>) -> Result<Self, LlmError> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.into();
        Ok(client)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    /// A single, non-retrying call to the provider. The LLM collaborator is
    /// out of scope beyond this `generate(prompt) -> text` boundary (§1); the
    /// "retry once" policy on transient failures belongs to the Agent
    /// Handler calling this, not the adapter (§7).
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = MessageRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            messages: vec![Message { role: "user".to_string(), content: prompt.to_string() }],
        };

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Rejected(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed(format!("{status}: {body}")));
        }

        let parsed: MessageResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .find_map(|block| (block.block_type == "text").then_some(block.text))
            .ok_or_else(|| LlmError::InvalidResponse("no text content block".to_string()))
    }
}

#[derive(Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig { provider: "anthropic".to_string(), api_key: Some("k".to_string()), model: "claude-sonnet".to_string() }
    }

    #[test]
    fn client_construction_defaults_base_url() {
        let client = HttpLlmClient::new(&test_config()).unwrap();
        assert_eq!(client.base_url, "https://api.anthropic.com");
    }

    #[tokio::test]
    async fn generate_returns_the_first_text_block_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":[{"type":"text","text":"a delivery plan"}]}"#)
            .create_async()
            .await;

        let client = HttpLlmClient::with_base_url(&test_config(), server.url()).unwrap();
        let text = client.generate("build a counter app").await.unwrap();

        assert_eq!(text, "a delivery plan");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn generate_maps_rate_limit_to_a_transient_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(429)
            .expect_at_least(1)
            .create_async()
            .await;

        let client = HttpLlmClient::with_base_url(&test_config(), server.url()).unwrap();
        let err = client.generate("x").await.unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn generate_surfaces_a_permanent_error_on_bad_request() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(400)
            .with_body("bad prompt")
            .create_async()
            .await;

        let client = HttpLlmClient::with_base_url(&test_config(), server.url()).unwrap();
        let err = client.generate("x").await.unwrap_err();

        assert!(!err.is_transient());
    }
}
