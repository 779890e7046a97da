//! Conversation orchestration for Tavern.
//!
//! A `ChatSession` ties a memory store and an optional character persona to
//! the prompt renderer and the completion or chat backends.

pub mod session;

use tavern_types::error::PromptError;
use tavern_types::llm::LlmError;

pub use session::ChatSession;

/// Errors from producing a reply.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}
