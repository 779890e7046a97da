//! Backend trait definitions.
//!
//! Both traits use native async fn in traits (RPITIT). They are not
//! object-safe; wrap them in the `box_backend` types for dynamic dispatch.

use std::future::Future;

use tavern_types::llm::{LlmError, Parameters};
use tavern_types::message::Message;

/// A text-completion server: takes a fully rendered prompt.
pub trait CompletionBackend: Send + Sync {
    /// Human-readable backend name (e.g., "opened-ai").
    fn name(&self) -> &str;

    /// Complete `prompt` with the given generation parameters.
    ///
    /// Non-success HTTP responses surface as [`LlmError::Backend`].
    fn complete(
        &self,
        prompt: &str,
        parameters: &Parameters,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Name of the model currently loaded on the server.
    fn loaded_model(&self) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// A chat server: takes the structured conversation.
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Send the conversation and return the reply as a typed message.
    fn chat(
        &self,
        messages: &[&Message],
        parameters: &Parameters,
    ) -> impl Future<Output = Result<Message, LlmError>> + Send;

    fn loaded_model(&self) -> impl Future<Output = Result<String, LlmError>> + Send;
}
