//! OpenedAiClient -- [`CompletionBackend`] and [`ChatBackend`] for an
//! OpenAI-compatible text-generation server.
//!
//! Endpoints (relative to the host):
//! - `POST /v1/completions` for raw prompts
//! - `POST /v1/chat/completions` for message lists
//! - `GET /v1/internal/model/info` for the loaded model
//! - `GET /openapi.json` for the request schemas
//!
//! Payloads are filtered down to the properties the server's request schema
//! declares, so presets can carry keys for other backends without the
//! server rejecting the request. Schema keys are cached per client: one hour
//! for completions, thirty seconds for chat.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::{Value, json};
use tracing::{Instrument, info_span};

use tavern_core::llm::{ChatBackend, CompletionBackend};
use tavern_observe::genai_attrs::{OP_CHAT, OP_COMPLETION, PROVIDER_OPENED_AI};
use tavern_types::llm::{ChatMessage, LlmError, Parameters};
use tavern_types::message::Message;

/// Request schemas published in the server's OpenAPI document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RequestSchema {
    Completion,
    ChatCompletion,
}

impl RequestSchema {
    fn name(self) -> &'static str {
        match self {
            RequestSchema::Completion => "CompletionRequest",
            RequestSchema::ChatCompletion => "ChatCompletionRequest",
        }
    }

    fn ttl(self) -> Duration {
        match self {
            RequestSchema::Completion => Duration::from_secs(3600),
            RequestSchema::ChatCompletion => Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct CachedKeys {
    keys: Arc<HashSet<String>>,
    fetched_at: Instant,
}

/// Client for an OpenAI-compatible text-generation server.
#[derive(Debug)]
pub struct OpenedAiClient {
    client: reqwest::Client,
    host: String,
    schema_keys: DashMap<RequestSchema, CachedKeys>,
}

impl OpenedAiClient {
    pub fn new(host: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();
        Self::with_client(client, host)
    }

    pub fn with_client(client: reqwest::Client, host: impl Into<String>) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self {
            client,
            host,
            schema_keys: DashMap::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    fn cached_keys(&self, schema: RequestSchema) -> Option<Arc<HashSet<String>>> {
        let entry = self.schema_keys.get(&schema)?;
        (entry.fetched_at.elapsed() < schema.ttl()).then(|| Arc::clone(&entry.keys))
    }

    /// Properties accepted by `schema`, or `None` when the schema cannot be
    /// fetched (the payload is then sent unfiltered).
    async fn allowed_keys(&self, schema: RequestSchema) -> Option<Arc<HashSet<String>>> {
        if let Some(keys) = self.cached_keys(schema) {
            return Some(keys);
        }

        match self.fetch_schema_keys(schema).await {
            Ok(keys) => {
                let keys = Arc::new(keys);
                self.schema_keys.insert(
                    schema,
                    CachedKeys {
                        keys: Arc::clone(&keys),
                        fetched_at: Instant::now(),
                    },
                );
                Some(keys)
            }
            Err(e) => {
                tracing::warn!(schema = schema.name(), error = %e, "could not load request schema, sending payload unfiltered");
                None
            }
        }
    }

    async fn fetch_schema_keys(&self, schema: RequestSchema) -> Result<HashSet<String>, LlmError> {
        let url = self.url("/openapi.json");
        let document = self.get_json(&url).await?;
        let pointer = format!("/components/schemas/{}/properties", schema.name());
        let properties = document
            .pointer(&pointer)
            .and_then(Value::as_object)
            .ok_or_else(|| LlmError::InvalidResponse(format!("{url}: no {} schema", schema.name())))?;
        Ok(properties.keys().cloned().collect())
    }

    async fn get_json(&self, url: &str) -> Result<Value, LlmError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LlmError::Http(format!("GET {url}: {e}")))?;
        Self::read_json(url, response).await
    }

    async fn post_json(&self, url: &str, payload: &Parameters) -> Result<Value, LlmError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| LlmError::Http(format!("POST {url}: {e}")))?;
        Self::read_json(url, response).await
    }

    async fn read_json(url: &str, response: reqwest::Response) -> Result<Value, LlmError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("ERROR: {} {body}", status.as_u16());
            return Err(LlmError::Backend {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("{url}: {e}")))
    }

    async fn send_completion(&self, prompt: &str, parameters: &Parameters) -> Result<String, LlmError> {
        let mut payload = Parameters::new();
        payload.insert("prompt".to_string(), json!(prompt));
        payload.insert("stream".to_string(), json!(false));
        payload.extend(parameters.clone());

        let allowed = self.allowed_keys(RequestSchema::Completion).await;
        let payload = filter_payload(payload, allowed.as_deref());
        tracing::debug!("OpenedAiClient request prompt:\n{prompt}");

        let url = self.url("/v1/completions");
        let response = self.post_json(&url, &payload).await?;
        let choice = first_choice(&url, &response)?;
        let text = choice
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::InvalidResponse(format!("{url}: choice has no text")))?;

        tracing::debug!("AI:\n{text}");
        tracing::debug!(finish_reason = ?choice.get("finish_reason"), "completion finished");
        Ok(text.to_string())
    }

    async fn send_chat(&self, messages: &[&Message], parameters: &Parameters) -> Result<Message, LlmError> {
        let wire: Vec<ChatMessage> = messages.iter().map(|m| ChatMessage::from(*m)).collect();
        let mut payload = Parameters::new();
        payload.insert("messages".to_string(), json!(wire));
        payload.extend(parameters.clone());

        let allowed = self.allowed_keys(RequestSchema::ChatCompletion).await;
        let payload = filter_payload(payload, allowed.as_deref());
        tracing::debug!(
            "OpenedAiClient request messages:\n{}",
            tavern_core::memory::messages_to_plaintext(messages.iter().copied())
        );

        let url = self.url("/v1/chat/completions");
        let response = self.post_json(&url, &payload).await?;
        let choice = first_choice(&url, &response)?;
        let reply: ChatMessage = choice
            .get("message")
            .cloned()
            .ok_or_else(|| LlmError::InvalidResponse(format!("{url}: choice has no message")))
            .and_then(|m| {
                serde_json::from_value(m).map_err(|e| LlmError::Deserialization(format!("{url}: {e}")))
            })?;

        let message = Message::from(reply);
        tracing::debug!("AI:\n{message}");
        tracing::debug!(finish_reason = ?choice.get("finish_reason"), "chat completion finished");
        Ok(message)
    }
}

/// Drop payload keys the server does not declare. `None` keeps everything.
fn filter_payload(mut payload: Parameters, allowed: Option<&HashSet<String>>) -> Parameters {
    if let Some(allowed) = allowed {
        payload.retain(|key, _| allowed.contains(key));
    }
    payload
}

fn first_choice<'a>(url: &str, response: &'a Value) -> Result<&'a Value, LlmError> {
    response
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| LlmError::InvalidResponse(format!("{url}: response has no choices")))
}

impl CompletionBackend for OpenedAiClient {
    fn name(&self) -> &str {
        PROVIDER_OPENED_AI
    }

    async fn complete(&self, prompt: &str, parameters: &Parameters) -> Result<String, LlmError> {
        let span = info_span!(
            "gen_ai.complete",
            gen_ai.operation.name = OP_COMPLETION,
            gen_ai.provider.name = PROVIDER_OPENED_AI,
            server.address = %self.host,
        );
        self.send_completion(prompt, parameters).instrument(span).await
    }

    async fn loaded_model(&self) -> Result<String, LlmError> {
        let url = self.url("/v1/internal/model/info");
        let info = self.get_json(&url).await?;
        info.get("model_name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse(format!("{url}: no model_name")))
    }
}

impl ChatBackend for OpenedAiClient {
    fn name(&self) -> &str {
        PROVIDER_OPENED_AI
    }

    async fn chat(&self, messages: &[&Message], parameters: &Parameters) -> Result<Message, LlmError> {
        let span = info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = OP_CHAT,
            gen_ai.provider.name = PROVIDER_OPENED_AI,
            server.address = %self.host,
        );
        self.send_chat(messages, parameters).instrument(span).await
    }

    async fn loaded_model(&self) -> Result<String, LlmError> {
        CompletionBackend::loaded_model(self).await
    }
}
