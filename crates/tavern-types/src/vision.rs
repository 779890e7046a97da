//! Vision/captioning types for Tavern.
//!
//! Configuration for the remote captioning backends (Ollama vision models,
//! Automatic1111 interrogation and the WD14 tagger extension), the caption
//! result, and vision errors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Hosts and models used by the vision pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Automatic1111 web UI host (interrogation + WD14 tagger).
    #[serde(default)]
    pub automatic1111_host: Option<String>,
    /// Ollama host used for vision-language captioning.
    #[serde(default)]
    pub ollama_host: Option<String>,
    /// Ollama model used when none is given per call (e.g. "llava").
    #[serde(default)]
    pub ollama_vision_model: Option<String>,
    /// Base site per chat adapter, used to resolve relative attachment URLs.
    #[serde(default)]
    pub base_sites: HashMap<String, String>,
}

/// Result of captioning one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    /// Free-text description of the image.
    pub caption: String,
    /// Tagger tags above the confidence threshold.
    pub tags: Vec<String>,
    /// Tagger content ratings above the confidence threshold.
    pub ratings: Vec<String>,
    /// Caption followed by the joined tags.
    pub text: String,
}

/// Errors from vision backends and image handling.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("no captioning backend configured")]
    NoBackend,

    #[error("no vision model configured")]
    NoModel,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("error response from the vision server ({url}): {status} ({body})")]
    Backend { url: String, status: u16, body: String },

    #[error("image error: {0}")]
    Image(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_config_defaults_from_empty_toml() {
        let config: VisionConfig = toml::from_str("").unwrap();
        assert!(config.ollama_host.is_none());
        assert!(config.base_sites.is_empty());
    }

    #[test]
    fn test_vision_config_from_toml() {
        let config: VisionConfig = toml::from_str(
            r#"
ollama_host = "http://localhost:11434"
ollama_vision_model = "llava"

[base_sites]
discord = "https://cdn.example.com"
"#,
        )
        .unwrap();
        assert_eq!(config.ollama_vision_model.as_deref(), Some("llava"));
        assert_eq!(config.base_sites["discord"], "https://cdn.example.com");
    }
}
