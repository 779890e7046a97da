//! Completion backend request/response types for Tavern.
//!
//! These types model the data shapes exchanged with completion and chat
//! backends: generation parameters, the OpenAI-style chat wire message, and
//! backend errors.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Role};

/// Generation parameters sent alongside a prompt (temperature, max_tokens, ...).
///
/// Kept as an open JSON map: backends filter it down to the keys their
/// server accepts.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// A chat message in the OpenAI-compatible wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    /// System and AI messages map to `system` / `assistant`; everything else
    /// is sent as `user`.
    fn from(message: &Message) -> Self {
        let role = match message.role() {
            Role::System => "system",
            Role::Ai => "assistant",
            Role::User | Role::Other(_) => "user",
        };
        Self {
            role: role.to_string(),
            content: message.text().to_string(),
        }
    }
}

impl From<ChatMessage> for Message {
    fn from(wire: ChatMessage) -> Self {
        let role = match wire.role.as_str() {
            "assistant" => Role::Ai,
            "system" => Role::System,
            "user" => Role::User,
            other => Role::Other(other.to_string()),
        };
        Message::new(role, wire.content)
    }
}

/// Errors from completion and chat backends.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("error response from the server ({url}): {status} ({body})")]
    Backend { url: String, status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
