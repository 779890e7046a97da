//! Model name to prompt format mapping.
//!
//! `model_templates.yaml` is an ordered map from a model-name regex to that
//! model family's config:
//!
//! ```yaml
//! "llama-?3.*instruct": { prompt_format: llama3-instruct }
//! ".*alpaca": { prompt_format: alpaca }
//! ".*": { prompt_format: chatml }
//! ```
//!
//! Patterns are tried in file order, case-insensitively, anchored at the
//! start of the model name. The first match wins.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tavern_types::error::ConfigError;

/// Config of one model family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Name of the template profile to render prompts with.
    pub prompt_format: String,
    /// Any other per-family settings, kept as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
struct ModelTemplate {
    pattern: String,
    regex: Regex,
    config: ModelConfig,
}

/// Ordered model-name patterns.
#[derive(Debug, Clone, Default)]
pub struct ModelTemplates {
    templates: Vec<ModelTemplate>,
}

impl ModelTemplates {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mapping: serde_yaml_ng::Mapping =
            serde_yaml_ng::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut templates = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let pattern = key
                .as_str()
                .ok_or_else(|| ConfigError::Parse(format!("model pattern is not a string: {key:?}")))?
                .to_string();
            let regex = Regex::new(&format!("(?i)^(?:{pattern})")).map_err(|e| {
                ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                }
            })?;
            let config: ModelConfig = serde_yaml_ng::from_value(value)
                .map_err(|e| ConfigError::Parse(format!("{pattern}: {e}")))?;
            templates.push(ModelTemplate {
                pattern,
                regex,
                config,
            });
        }
        Ok(Self { templates })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Io(format!("{}: {e}", path.display())),
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Config of the first pattern matching `model_name`.
    pub fn config_for_model(&self, model_name: &str) -> Result<&ModelConfig, ConfigError> {
        let template = self
            .templates
            .iter()
            .find(|t| t.regex.is_match(model_name))
            .ok_or_else(|| ConfigError::NoModelMatch(model_name.to_string()))?;
        tracing::debug!(model = model_name, pattern = %template.pattern, "found matching model config");
        Ok(&template.config)
    }

    /// Template profile name for `model_name`.
    pub fn prompt_format_for_model(&self, model_name: &str) -> Result<&str, ConfigError> {
        Ok(&self.config_for_model(model_name)?.prompt_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
"llama-?3.*instruct":
  prompt_format: llama3-instruct
  context_length: 8192
".*alpaca":
  prompt_format: alpaca
"mistral":
  prompt_format: chatml
"#;

    #[test]
    fn test_first_match_in_file_order() {
        let templates = ModelTemplates::from_yaml(YAML).unwrap();
        assert_eq!(templates.len(), 3);
        assert_eq!(
            templates.prompt_format_for_model("Llama3-8B-Instruct").unwrap(),
            "llama3-instruct"
        );
        assert_eq!(templates.prompt_format_for_model("gpt4-x-alpaca").unwrap(), "alpaca");

        let config = templates.config_for_model("llama-3-70b-instruct").unwrap();
        assert_eq!(config.extra["context_length"], serde_json::json!(8192));
    }

    #[test]
    fn test_match_is_anchored_at_start() {
        let templates = ModelTemplates::from_yaml(YAML).unwrap();
        assert_eq!(templates.prompt_format_for_model("Mistral-7B").unwrap(), "chatml");
        assert!(matches!(
            templates.prompt_format_for_model("openhermes-mistral"),
            Err(ConfigError::NoModelMatch(name)) if name == "openhermes-mistral"
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = ModelTemplates::from_yaml("\"(unclosed\":\n  prompt_format: chatml\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_templates.yaml");
        std::fs::write(&path, YAML).unwrap();
        assert_eq!(ModelTemplates::from_file(&path).unwrap().len(), 3);
        assert!(matches!(
            ModelTemplates::from_file(&dir.path().join("missing.yaml")),
            Err(ConfigError::NotFound(_))
        ));
    }
}
