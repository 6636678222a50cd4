//! Model invocation gateway.
//!
//! Delivers an ordered conversation to a chat-completions style backend and
//! returns the reply as a new assistant message. The gateway owns:
//!
//! - prepending the standing system instruction (unless a call overrides it)
//! - per-model-family rewrites (reasoning models reject system roles,
//!   search-preview models require typed content blocks)
//! - the fixed retry policy for transient transport failures
//! - reply parsing and token-usage observation
//!
//! Which model id a call uses is the orchestrator's concern — the gateway
//! holds no alias policy. All settings are injected at construction; there is
//! no global configuration state.

mod http;

pub use http::HttpChatTransport;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use taskforge_core::error::GatewayError;
use taskforge_core::message::{Message, MessageContent};
use taskforge_core::transport::ChatTransport;
use tracing::{debug, warn};

/// Maximum delivery attempts per call.
const MAX_DELIVERY_ATTEMPTS: u32 = 5;

/// A body at or below this size is treated as effectively empty.
const TRIVIAL_BODY_BYTES: usize = 10;

/// Wait after an effectively-empty body before retrying.
const EMPTY_BODY_WAIT: Duration = Duration::from_secs(2);

/// Wait after a non-success status before retrying.
const ERROR_STATUS_WAIT: Duration = Duration::from_secs(3);

/// Hint for the shape of the model's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// Structured JSON object output.
    Json,
}

impl ResponseFormat {
    fn wire_name(&self) -> &'static str {
        match self {
            ResponseFormat::Text => "text",
            ResponseFormat::Json => "json_object",
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Replaces the standing system instruction for this call.
    pub instructions: Option<String>,

    /// Reply shape hint. Ignored for reasoning-family models, which reject
    /// the field.
    pub response_format: ResponseFormat,

    /// Overrides the configured default temperature.
    pub temperature: Option<f32>,
}

/// Generation settings injected at construction.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub max_completion_tokens: u32,
    pub default_temperature: f32,
}

/// The gateway over a [`ChatTransport`].
pub struct ModelGateway {
    transport: Arc<dyn ChatTransport>,
    standing_instructions: String,
    generation: GenerationSettings,
}

impl ModelGateway {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        standing_instructions: impl Into<String>,
        generation: GenerationSettings,
    ) -> Self {
        Self {
            transport,
            standing_instructions: standing_instructions.into(),
            generation,
        }
    }

    /// Send a conversation to the given model and return its reply as a new
    /// assistant message.
    ///
    /// Exhausting the retry budget returns a typed error — the caller decides
    /// whether to abort the run, retry it, or report partial progress.
    pub async fn send(
        &self,
        model: &str,
        messages: Vec<Message>,
        opts: SendOptions,
    ) -> Result<Message, GatewayError> {
        let body = self.build_body(model, messages, &opts);

        let mut last_status: Option<u16> = None;
        let mut malformed_success = false;

        for attempt in 1..=MAX_DELIVERY_ATTEMPTS {
            let reply = match self.transport.post_chat(&body).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(model, attempt, error = %e, "Transport error, retrying");
                    last_status = None;
                    malformed_success = false;
                    if attempt < MAX_DELIVERY_ATTEMPTS {
                        tokio::time::sleep(ERROR_STATUS_WAIT).await;
                    }
                    continue;
                }
            };

            if reply.body.len() <= TRIVIAL_BODY_BYTES {
                warn!(model, attempt, size = reply.body.len(), "Got an effectively empty body, retrying");
                last_status = Some(reply.status);
                malformed_success = false;
                if attempt < MAX_DELIVERY_ATTEMPTS {
                    tokio::time::sleep(EMPTY_BODY_WAIT).await;
                }
                continue;
            }

            if reply.status != 200 {
                warn!(model, attempt, status = reply.status, "Got a non-success status, retrying");
                last_status = Some(reply.status);
                malformed_success = false;
                if attempt < MAX_DELIVERY_ATTEMPTS {
                    tokio::time::sleep(ERROR_STATUS_WAIT).await;
                }
                continue;
            }

            match extract_content(&reply.body) {
                Some((content, usage)) => {
                    if let Some(usage) = usage {
                        // Observed for diagnostics; not propagated to callers.
                        debug!(
                            model,
                            prompt_tokens = usage.prompt_tokens,
                            completion_tokens = usage.completion_tokens,
                            "Model call succeeded"
                        );
                    }
                    return Ok(Message::assistant(content));
                }
                None => {
                    warn!(model, attempt, "Reply parsed but carried no response content, retrying");
                    last_status = Some(200);
                    malformed_success = true;
                    if attempt < MAX_DELIVERY_ATTEMPTS {
                        tokio::time::sleep(ERROR_STATUS_WAIT).await;
                    }
                }
            }
        }

        if malformed_success {
            return Err(GatewayError::MalformedReply(format!(
                "no response content after {MAX_DELIVERY_ATTEMPTS} attempts"
            )));
        }

        Err(GatewayError::RetriesExhausted {
            attempts: MAX_DELIVERY_ATTEMPTS,
            last_status,
        })
    }

    /// Assemble the wire request body for one call.
    fn build_body(&self, model: &str, messages: Vec<Message>, opts: &SendOptions) -> serde_json::Value {
        let rule_text = opts
            .instructions
            .clone()
            .unwrap_or_else(|| self.standing_instructions.clone());

        let mut conversation = Vec::with_capacity(messages.len() + 1);
        conversation.push(Message::system(rule_text));
        conversation.extend(messages);

        let reasoning = is_reasoning_family(model);
        let search = is_search_family(model);

        let wire_messages: Vec<serde_json::Value> = conversation
            .iter()
            .map(|m| {
                // Reasoning models reject system-role messages outright.
                let role = if reasoning && m.role == taskforge_core::message::Role::System {
                    "user"
                } else {
                    m.role.as_str()
                };

                // Search-preview backends require the block form.
                let content = if search {
                    serde_json::to_value(m.content.to_blocks()).unwrap_or_default()
                } else {
                    serde_json::Value::String(m.content.as_text())
                };

                serde_json::json!({ "role": role, "content": content })
            })
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": wire_messages,
        });

        if reasoning {
            body["max_completion_tokens"] =
                serde_json::json!(self.generation.max_completion_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(self.generation.max_tokens);
            body["response_format"] =
                serde_json::json!({ "type": opts.response_format.wire_name() });
            body["temperature"] = serde_json::json!(
                opts.temperature.unwrap_or(self.generation.default_temperature)
            );
        }

        body
    }
}

/// Does this model belong to the reasoning family (no system roles,
/// `max_completion_tokens` on the wire)?
fn is_reasoning_family(model: &str) -> bool {
    model.contains("o1") || model.contains("o3") || model.contains("o4")
}

/// Does this model belong to the search-preview family (block content)?
fn is_search_family(model: &str) -> bool {
    model.contains("search")
}

// --- Reply parsing ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ApiReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Pull `choices[0].message.content` (and usage) out of a raw reply body.
fn extract_content(body: &str) -> Option<(String, Option<ApiUsage>)> {
    let parsed: ApiResponse = serde_json::from_str(body.trim()).ok()?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)?;
    Some((content, parsed.usage))
}
