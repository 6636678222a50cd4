//! Conversation message types.
//!
//! These are the value objects that flow between the orchestrator, the
//! evaluator, and the model invocation gateway. Content is either plain text
//! or an ordered sequence of typed blocks — some backends (the search-preview
//! family) reject a bare string and require the block form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (standing rules, report framing)
    System,
    /// The caller / orchestrator
    User,
    /// The model's reply
    Assistant,
}

impl Role {
    /// The wire name used by chat-completions style APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single typed content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ContentBlock {
    /// A plain text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".into(),
            text: text.into(),
        }
    }
}

/// Message content — plain text or an ordered block sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Flatten to plain text (blocks are joined in order).
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// The block form, promoting plain text to a single text block.
    pub fn to_blocks(&self) -> Vec<ContentBlock> {
        match self {
            MessageContent::Text(s) => vec![ContentBlock::text(s.clone())],
            MessageContent::Blocks(blocks) => blocks.clone(),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The content
    pub content: MessageContent,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new user message with plain text content.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message with plain text content.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message with plain text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
            timestamp: Utc::now(),
        }
    }

    /// Create a user message carrying typed content blocks.
    pub fn user_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Blocks(blocks),
            timestamp: Utc::now(),
        }
    }

    /// The message content flattened to plain text.
    pub fn text(&self) -> String {
        self.content.as_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Find prior art");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Find prior art");
    }

    #[test]
    fn block_content_flattens_in_order() {
        let msg = Message::user_blocks(vec![
            ContentBlock::text("first"),
            ContentBlock::text("second"),
        ]);
        assert_eq!(msg.text(), "first\nsecond");
    }

    #[test]
    fn text_promotes_to_single_block() {
        let content = MessageContent::Text("hello".into());
        let blocks = content.to_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, "text");
        assert_eq!(blocks[0].text, "hello");
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::system("Be concise.");
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.role, Role::System);
        assert_eq!(deserialized.text(), "Be concise.");
    }

    #[test]
    fn block_serialization_uses_type_field() {
        let block = ContentBlock::text("hi");
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains(r#""type":"text""#));
    }
}
