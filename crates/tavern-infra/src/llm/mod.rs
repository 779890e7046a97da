//! Backend implementations.
//!
//! Contains concrete implementations of the [`CompletionBackend`] and
//! [`ChatBackend`] traits defined in `tavern-core`, plus factories that build
//! boxed backends from a [`TavernConfig`].
//!
//! [`CompletionBackend`]: tavern_core::llm::CompletionBackend
//! [`ChatBackend`]: tavern_core::llm::ChatBackend

pub mod opened_ai;

use tavern_core::llm::{BoxChatBackend, BoxCompletionBackend};
use tavern_types::config::TavernConfig;

use self::opened_ai::OpenedAiClient;

/// Completion backend for the configured host, or `host_override` if given.
pub fn create_completion_backend(config: &TavernConfig, host_override: Option<&str>) -> BoxCompletionBackend {
    let host = host_override.unwrap_or(&config.backend_host);
    tracing::debug!(host, "creating completion backend");
    BoxCompletionBackend::new(OpenedAiClient::new(host))
}

/// Chat backend for the configured host, or `host_override` if given.
pub fn create_chat_backend(config: &TavernConfig, host_override: Option<&str>) -> BoxChatBackend {
    let host = host_override.unwrap_or(&config.backend_host);
    tracing::debug!(host, "creating chat backend");
    BoxChatBackend::new(OpenedAiClient::new(host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tavern_core::llm::{ChatBackend, CompletionBackend};

    #[test]
    fn test_factories_use_opened_ai() {
        let config = TavernConfig::default();
        let completion = create_completion_backend(&config, None);
        assert_eq!(CompletionBackend::name(&completion), "opened_ai");
        let chat = create_chat_backend(&config, Some("http://gpu-box:5000"));
        assert_eq!(ChatBackend::name(&chat), "opened_ai");
    }
}
