//! Transcript files: conversations stored as YAML.
//!
//! ```yaml
//! character:
//!   name: Luna
//!   description: A curious fox spirit.
//! messages:
//!   - { role: system, text: "You are Luna.", pinned: true }
//!   - { role: user, text: "Hi!", name: Ana }
//!   - { role: ai, text: "Hello, Ana." }
//! ```
//!
//! A bare list of messages is accepted too.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use tavern_core::chat::ChatSession;
use tavern_core::memory::{MemoryStore, SlidingWindowMemory};
use tavern_types::character::Character;
use tavern_types::message::{Message, Role};

/// One message of a transcript.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Pinned messages stay in the sliding window regardless of budget.
    #[serde(default)]
    pub pinned: bool,
}

impl TranscriptEntry {
    pub fn to_message(&self) -> Message {
        let message = Message::new(self.role.clone(), self.text.clone());
        match &self.name {
            Some(name) => message.with_name(name.clone()),
            None => message,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Messages(Vec<TranscriptEntry>),
    Document {
        #[serde(default)]
        character: Option<Character>,
        messages: Vec<TranscriptEntry>,
    },
}

/// A parsed transcript.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub character: Option<Character>,
    pub messages: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: TranscriptFile = serde_yaml_ng::from_str(yaml).context("invalid transcript")?;
        Ok(match file {
            TranscriptFile::Messages(messages) => Self {
                character: None,
                messages,
            },
            TranscriptFile::Document {
                character,
                messages,
            } => Self {
                character,
                messages,
            },
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("in {}", path.display()))
    }

    /// Load the transcript into a sliding-window session. Messages marked
    /// `pinned` are pinned, the rest go through the window in order.
    pub fn into_session(self, token_limit: usize, keep_max: usize) -> ChatSession<SlidingWindowMemory> {
        let memory = SlidingWindowMemory::new(token_limit).with_keep_max(keep_max);
        let mut session = ChatSession::new(memory);
        if let Some(character) = self.character {
            session = session.with_character(character);
        }
        for entry in &self.messages {
            if entry.pinned {
                session.memory_mut().pin(entry.to_message());
            } else {
                session.memory_mut().add_message(entry.to_message());
            }
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_list() {
        let transcript = Transcript::from_yaml(
            "- { role: user, text: Hi, name: Ana }\n- { role: assistant, text: Hello }\n",
        )
        .unwrap();
        assert!(transcript.character.is_none());
        assert_eq!(transcript.messages.len(), 2);
        assert_eq!(transcript.messages[1].role, Role::Ai);
        assert_eq!(transcript.messages[0].to_message().name(), "Ana");
    }

    #[test]
    fn test_document_into_session() {
        let yaml = r#"
character:
  name: Luna
messages:
  - { role: system, text: "You are Luna.", pinned: true }
  - { role: user, text: "a b c d e f g h" }
  - { role: user, text: "Hi!" }
"#;
        let session = Transcript::from_yaml(yaml).unwrap().into_session(5, 0);
        assert_eq!(session.ai_name(), "Luna");
        assert_eq!(session.memory().pinned_messages().len(), 1);
        assert_eq!(session.memory().messages_all().len(), 2);

        let view: Vec<&str> = session.memory().messages().iter().map(|m| m.text()).collect();
        assert_eq!(view, vec!["You are Luna.", "Hi!"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.yaml");
        std::fs::write(&path, "- { role: user, text: Hi }\n").unwrap();
        assert_eq!(Transcript::load(&path).unwrap().messages.len(), 1);
        assert!(Transcript::load(&dir.path().join("missing.yaml")).is_err());
    }
}
