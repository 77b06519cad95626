use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use super::{
    directive::{display_text, DIRECTIVE_MARKER},
    ChatMessage, ChatSender, SendOptions,
};

/// Terminal stand-in for the remote agent: echoes the visible part of each
/// message and keeps the full transcript.
#[derive(Default)]
pub struct ConsoleChat {
    transcript: Mutex<Vec<ChatMessage>>,
}

impl ConsoleChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Transcript lines as a person would see them, directives removed.
    pub fn visible_lines(&self) -> Vec<String> {
        self.transcript()
            .iter()
            .filter_map(|message| {
                let text = message.text();
                display_text(&text).map(|visible| format!("{:?}: {visible}", message.role))
            })
            .collect()
    }
}

#[async_trait]
impl ChatSender for ConsoleChat {
    async fn send_message(&self, message: ChatMessage, options: SendOptions) -> Result<()> {
        let text = message.text();
        match display_text(&text) {
            Some(visible) => println!("› {visible}"),
            None => debug!("sending directive-only message"),
        }
        if text.contains(DIRECTIVE_MARKER) {
            debug!("outgoing message carries agent directive: {text:?}");
        }
        if !options.body.is_empty() {
            debug!("extra request body: {}", serde_json::Value::Object(options.body));
        }

        self.transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
        Ok(())
    }
}
