//! The transport seam under the model invocation gateway.
//!
//! The gateway owns retry policy, message rewriting, and reply parsing; the
//! transport only delivers one JSON request body and returns the raw status
//! and body. Tests implement this trait with scripted replies.

use async_trait::async_trait;

use crate::error::GatewayError;

/// The raw outcome of one delivery attempt.
#[derive(Debug, Clone)]
pub struct TransportReply {
    /// HTTP status code (200 = success)
    pub status: u16,

    /// Raw response body
    pub body: String,
}

/// Delivers a chat-completions request body to a backend.
///
/// Implementations: `taskforge_gateway::HttpChatTransport` (reqwest), scripted
/// mocks in tests.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// A human-readable name for this transport.
    fn name(&self) -> &str;

    /// Send one request body and return the raw reply.
    ///
    /// A `GatewayError` here means delivery itself failed (network layer);
    /// non-200 statuses come back as a normal `TransportReply` so the gateway
    /// can apply its retry policy.
    async fn post_chat(
        &self,
        body: &serde_json::Value,
    ) -> std::result::Result<TransportReply, GatewayError>;
}
