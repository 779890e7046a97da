//! Object-safe dynamic dispatch wrappers for the backend traits.
//!
//! Same blanket-impl pattern for both traits:
//! 1. An object-safe `*Dyn` trait with boxed futures
//! 2. A blanket impl of it for every implementor of the RPITIT trait
//! 3. A `Box*` struct wrapping `Box<dyn *Dyn>` that delegates

use std::future::Future;
use std::pin::Pin;

use tavern_types::llm::{LlmError, Parameters};
use tavern_types::message::Message;

use super::backend::{ChatBackend, CompletionBackend};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LlmError>> + Send + 'a>>;

/// Object-safe version of [`CompletionBackend`].
pub trait CompletionBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn complete_boxed<'a>(
        &'a self,
        prompt: &'a str,
        parameters: &'a Parameters,
    ) -> BoxFuture<'a, String>;

    fn loaded_model_boxed(&self) -> BoxFuture<'_, String>;
}

impl<T: CompletionBackend> CompletionBackendDyn for T {
    fn name(&self) -> &str {
        CompletionBackend::name(self)
    }

    fn complete_boxed<'a>(
        &'a self,
        prompt: &'a str,
        parameters: &'a Parameters,
    ) -> BoxFuture<'a, String> {
        Box::pin(self.complete(prompt, parameters))
    }

    fn loaded_model_boxed(&self) -> BoxFuture<'_, String> {
        Box::pin(CompletionBackend::loaded_model(self))
    }
}

/// Type-erased completion backend.
pub struct BoxCompletionBackend {
    inner: Box<dyn CompletionBackendDyn + Send + Sync>,
}

impl BoxCompletionBackend {
    pub fn new<T: CompletionBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }
}

impl CompletionBackend for BoxCompletionBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, prompt: &str, parameters: &Parameters) -> Result<String, LlmError> {
        self.inner.complete_boxed(prompt, parameters).await
    }

    async fn loaded_model(&self) -> Result<String, LlmError> {
        self.inner.loaded_model_boxed().await
    }
}

/// Object-safe version of [`ChatBackend`].
pub trait ChatBackendDyn: Send + Sync {
    fn name(&self) -> &str;

    fn chat_boxed<'a>(
        &'a self,
        messages: &'a [&'a Message],
        parameters: &'a Parameters,
    ) -> BoxFuture<'a, Message>;

    fn loaded_model_boxed(&self) -> BoxFuture<'_, String>;
}

impl<T: ChatBackend> ChatBackendDyn for T {
    fn name(&self) -> &str {
        ChatBackend::name(self)
    }

    fn chat_boxed<'a>(
        &'a self,
        messages: &'a [&'a Message],
        parameters: &'a Parameters,
    ) -> BoxFuture<'a, Message> {
        Box::pin(self.chat(messages, parameters))
    }

    fn loaded_model_boxed(&self) -> BoxFuture<'_, String> {
        Box::pin(ChatBackend::loaded_model(self))
    }
}

/// Type-erased chat backend.
pub struct BoxChatBackend {
    inner: Box<dyn ChatBackendDyn + Send + Sync>,
}

impl BoxChatBackend {
    pub fn new<T: ChatBackend + 'static>(backend: T) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }
}

impl ChatBackend for BoxChatBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn chat(&self, messages: &[&Message], parameters: &Parameters) -> Result<Message, LlmError> {
        self.inner.chat_boxed(messages, parameters).await
    }

    async fn loaded_model(&self) -> Result<String, LlmError> {
        self.inner.loaded_model_boxed().await
    }
}
