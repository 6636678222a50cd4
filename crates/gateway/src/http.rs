//! HTTP transport — a single synchronous POST per delivery attempt.

use async_trait::async_trait;
use taskforge_core::error::GatewayError;
use taskforge_core::transport::{ChatTransport, TransportReply};
use tracing::debug;

/// Delivers request bodies to a chat-completions endpoint over HTTPS with
/// bearer-token authorization.
pub struct HttpChatTransport {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpChatTransport {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn post_chat(
        &self,
        body: &serde_json::Value,
    ) -> Result<TransportReply, GatewayError> {
        debug!(endpoint = %self.endpoint, "Posting chat request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(TransportReply { status, body })
    }
}
