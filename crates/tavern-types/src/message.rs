//! Chat message types for Tavern.
//!
//! A [`Message`] is one conversation turn tagged with a [`Role`] and a
//! speaker name. Messages are immutable once built: the token count is
//! computed a single time by the tokenizer supplied at construction.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tokenizer::{Tokenizer, WordTokenizer};

/// Default speaker name of AI messages.
pub const AI_NAME: &str = "AI";

/// Role of a message in a conversation.
///
/// `System`, `User` and `Ai` are the roles the prompt renderer has templates
/// for. `Other` carries roles that arrive from outside (for example a
/// `tool` message returned by a chat backend); they are kept rather than
/// dropped and render as a visible placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Ai,
    Other(String),
}

impl Role {
    /// Speaker name used when a message is built without an explicit name.
    pub fn default_name(&self) -> &str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Ai => AI_NAME,
            Role::Other(kind) => kind,
        }
    }

    /// Key of the per-role template in a template profile.
    ///
    /// `None` for extension roles, which have no template.
    pub fn template_key(&self) -> Option<&'static str> {
        match self {
            Role::System => Some("SystemMessage"),
            Role::User => Some("UserMessage"),
            Role::Ai => Some("AIMessage"),
            Role::Other(_) => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Ai => write!(f, "ai"),
            Role::Other(kind) => write!(f, "{kind}"),
        }
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "ai" | "assistant" => Role::Ai,
            _ => Role::Other(s.to_string()),
        })
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(role) => role,
            Err(never) => match never {},
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    text: String,
    name: String,
    role: Role,
    token_count: usize,
}

impl Message {
    /// Build a message, counting tokens with the default [`WordTokenizer`].
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self::with_tokenizer(role, text, &WordTokenizer)
    }

    /// Build a message, counting tokens with the given tokenizer.
    pub fn with_tokenizer(role: Role, text: impl Into<String>, tokenizer: &dyn Tokenizer) -> Self {
        let text = text.into();
        let token_count = tokenizer.count(&text);
        let name = role.default_name().to_string();
        Self {
            text,
            name,
            role,
            token_count,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(Role::Ai, text)
    }

    /// Override the speaker name. An empty name keeps the role default.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.name = name;
        }
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.text)
    }
}
