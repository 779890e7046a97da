//! Chat session: memory + persona + backends.
//!
//! One request/response cycle:
//! 1. Caller appends the user's turn.
//! 2. The memory store produces its current view.
//! 3. The view is rendered (completion backends) or sent as-is (chat backends).
//! 4. The reply is wrapped as an AI message and appended to memory.

use tavern_types::character::Character;
use tavern_types::llm::Parameters;
use tavern_types::message::{AI_NAME, Message, Role};

use super::ChatError;
use crate::llm::{ChatBackend, CompletionBackend};
use crate::memory::MemoryStore;
use crate::prompt::profile::ProfileSource;
use crate::prompt::renderer::{PromptRenderer, RenderOptions};
use crate::text::trim_incomplete_sentence;

/// A conversation held in a memory store, optionally spoken by a persona.
#[derive(Debug, Clone)]
pub struct ChatSession<M> {
    memory: M,
    character: Option<Character>,
}

impl<M: MemoryStore> ChatSession<M> {
    pub fn new(memory: M) -> Self {
        Self {
            memory,
            character: None,
        }
    }

    /// Let `character` speak the AI turns.
    pub fn with_character(mut self, character: Character) -> Self {
        character.warn_if_unnamed();
        self.character = Some(character);
        self
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn character(&self) -> Option<&Character> {
        self.character.as_ref()
    }

    pub fn character_mut(&mut self) -> Option<&mut Character> {
        self.character.as_mut()
    }

    /// Speaker name of AI turns: the persona's name, else the role default.
    pub fn ai_name(&self) -> &str {
        self.character
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or(AI_NAME)
    }

    pub fn push_message(&mut self, message: Message) {
        self.memory.add_message(message);
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push_message(Message::user(text));
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.push_message(Message::system(text));
    }

    /// Render the current view with `profile` and the persona as next speaker.
    pub fn render_prompt<S: ProfileSource>(
        &self,
        renderer: &PromptRenderer<S>,
        profile: &str,
    ) -> Result<String, ChatError> {
        let options = RenderOptions::default().next_speaker(self.ai_name());
        Ok(renderer.render_with(self.memory.messages(), profile, options)?)
    }

    /// Produce the next AI turn with a completion backend.
    ///
    /// The reply is cut after its last complete sentence, named after the
    /// persona, appended to memory, and returned.
    pub async fn respond_with_completion<B, S>(
        &mut self,
        backend: &B,
        renderer: &PromptRenderer<S>,
        profile: &str,
        parameters: &Parameters,
    ) -> Result<Message, ChatError>
    where
        B: CompletionBackend,
        S: ProfileSource,
    {
        let prompt = self.render_prompt(renderer, profile)?;
        let raw = backend.complete(&prompt, parameters).await?;
        let text = trim_incomplete_sentence(raw.trim()).trim();
        tracing::debug!(backend = backend.name(), chars = text.len(), "completion reply");

        let reply = Message::ai(text).with_name(self.ai_name());
        self.memory.add_message(reply.clone());
        Ok(reply)
    }

    /// Produce the next turn with a chat backend.
    ///
    /// AI replies are named after the persona; other roles keep their
    /// default name.
    pub async fn respond_with_chat<B: ChatBackend>(
        &mut self,
        backend: &B,
        parameters: &Parameters,
    ) -> Result<Message, ChatError> {
        let mut reply = backend.chat(&self.memory.messages(), parameters).await?;
        if reply.role() == &Role::Ai {
            reply = reply.with_name(self.ai_name());
        }
        tracing::debug!(backend = backend.name(), role = %reply.role(), "chat reply");

        self.memory.add_message(reply.clone());
        Ok(reply)
    }
}
