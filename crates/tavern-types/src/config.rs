//! Global configuration types for Tavern.
//!
//! `TavernConfig` represents the top-level `config.toml` that points the
//! toolkit at its template, preset and model-template files and at the
//! remote backends.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::vision::VisionConfig;

/// Top-level configuration for the Tavern toolkit.
///
/// Loaded from `~/.tavern/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TavernConfig {
    /// Directory holding `chat/<profile>.yaml` and `system/<name>.jinja`.
    /// Built-in profiles are used when unset.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,

    /// Directory holding `<preset>.yaml` generation presets.
    #[serde(default)]
    pub presets_dir: Option<PathBuf>,

    /// YAML file mapping model-name regexes to model configs.
    #[serde(default)]
    pub model_templates_path: Option<PathBuf>,

    /// Template profile used when none is requested.
    #[serde(default = "default_profile")]
    pub default_profile: String,

    /// Sliding-window token limit for conversations (0 = unbounded).
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,

    /// Hard cap on stored messages (0 = unbounded).
    #[serde(default)]
    pub keep_max: usize,

    /// Base URL of the OpenAI-compatible text-generation server.
    #[serde(default = "default_backend_host")]
    pub backend_host: String,

    /// Remote captioning backends.
    #[serde(default)]
    pub vision: VisionConfig,
}

fn default_profile() -> String {
    "chatml".to_string()
}

fn default_token_limit() -> usize {
    2048
}

fn default_backend_host() -> String {
    "http://127.0.0.1:5000".to_string()
}

impl Default for TavernConfig {
    fn default() -> Self {
        Self {
            templates_dir: None,
            presets_dir: None,
            model_templates_path: None,
            default_profile: default_profile(),
            token_limit: default_token_limit(),
            keep_max: 0,
            backend_host: default_backend_host(),
            vision: VisionConfig::default(),
        }
    }
}
