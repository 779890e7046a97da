//! OpenTelemetry GenAI semantic convention values used in backend spans.
//!
//! Spans carry the convention's dotted field names directly, e.g.
//! `gen_ai.operation.name = OP_COMPLETION`, and are named
//! `"{operation} {target}"` (e.g. `"text_completion http://127.0.0.1:5000"`).

// --- Operation name values ---

/// Raw prompt completion (`/v1/completions`).
pub const OP_COMPLETION: &str = "text_completion";

/// Chat completion (`/v1/chat/completions`).
pub const OP_CHAT: &str = "chat";

/// Image captioning or tagging.
pub const OP_CAPTION: &str = "caption";

/// Prompt rendering from a conversation.
pub const OP_RENDER_PROMPT: &str = "render_prompt";

// --- Provider name values ---

/// OpenAI-compatible text-generation server.
pub const PROVIDER_OPENED_AI: &str = "opened_ai";

/// Ollama vision models.
pub const PROVIDER_OLLAMA: &str = "ollama";

/// Automatic1111 interrogators (CLIP, BLIP, WD14 tagger).
pub const PROVIDER_AUTOMATIC1111: &str = "automatic1111";
