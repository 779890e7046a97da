use thiserror::Error;

/// Errors from the string-templating engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("undefined variable '{name}' at byte {offset}")]
    UndefinedVariable { name: String, offset: usize },
}

/// Errors from rendering a conversation into a prompt.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template profile '{0}' not found")]
    ConfigNotFound(String),

    #[error("invalid template profile '{name}': {message}")]
    InvalidProfile { name: String, message: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Errors from loading configuration, presets and model templates.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid model pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("unable to find matching config for model: {0}")]
    NoModelMatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_display() {
        let err = TemplateError::UndefinedVariable {
            name: "message.text".to_string(),
            offset: 12,
        };
        assert_eq!(err.to_string(), "undefined variable 'message.text' at byte 12");
    }

    #[test]
    fn test_prompt_error_wraps_template_error() {
        let err: PromptError = TemplateError::Syntax {
            offset: 3,
            message: "unclosed tag".to_string(),
        }
        .into();
        assert!(matches!(err, PromptError::Template(_)));
        assert!(err.to_string().contains("unclosed tag"));
    }

    #[test]
    fn test_config_not_found_display() {
        let err = PromptError::ConfigNotFound("chatml".to_string());
        assert_eq!(err.to_string(), "template profile 'chatml' not found");
    }

    #[test]
    fn test_no_model_match_display() {
        let err = ConfigError::NoModelMatch("mystery-7b".to_string());
        assert!(err.to_string().contains("mystery-7b"));
    }
}
