//! Message shapes exchanged with the remote study agent and the sending
//! seam the coordinator talks through.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod console;
pub mod directive;

pub use console::ConsoleChat;
pub use directive::{display_text, with_directive, DIRECTIVE_MARKER};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessagePart {
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

impl ChatMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![MessagePart::Text { text: text.into() }],
        }
    }

    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                MessagePart::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Extra request body fields forwarded alongside a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendOptions {
    #[serde(default)]
    pub body: Map<String, Value>,
}

impl SendOptions {
    pub fn with_body(body: Map<String, Value>) -> Self {
        Self { body }
    }
}

/// Appends a message to the conversation and forwards it to the agent.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_message(&self, message: ChatMessage, options: SendOptions) -> Result<()>;
}
