//! System-message templates.
//!
//! Bots describe themselves through a system message built from a template
//! file (`<templates_dir>/system/<name>.jinja`) and a context, usually a
//! character persona's [`to_context`](tavern_types::character::Character::to_context).

use std::path::Path;

use serde_json::Value;
use tavern_types::error::{ConfigError, TemplateError};
use tavern_types::message::Message;

use super::engine::Template;

/// A template used to create system messages for bots.
#[derive(Debug, Clone)]
pub struct SystemMessageTemplate {
    template: Template,
}

impl SystemMessageTemplate {
    pub fn new(template: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            template: Template::parse(template)?,
        })
    }

    /// Load `<templates_dir>/system/<name>.jinja`.
    pub fn from_template(templates_dir: &Path, name: &str) -> Result<Self, ConfigError> {
        let path = templates_dir.join("system").join(format!("{name}.jinja"));
        let source = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.display().to_string()),
            _ => ConfigError::Io(format!("{}: {e}", path.display())),
        })?;
        Self::new(&source).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
    }

    pub fn format(&self, context: &Value) -> Result<String, TemplateError> {
        self.template.render(context)
    }

    /// Render straight into a system [`Message`].
    pub fn to_message(&self, context: &Value) -> Result<Message, TemplateError> {
        Ok(Message::system(self.format(context)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tavern_types::character::Character;
    use tavern_types::message::Role;

    const PERSONA: &str = "You are {{ name }}. {{ description }}\n\
{% if task %}\n\
Current task: {{ task }}\n\
{% endif %}\n";

    #[test]
    fn test_format_with_character_context() {
        let mut luna = Character::new("Luna");
        luna.description = "A curious moon spirit.".to_string();
        let template = SystemMessageTemplate::new(PERSONA).unwrap();

        let text = template.format(&luna.to_context()).unwrap();
        assert_eq!(text, "You are Luna. A curious moon spirit.\n");

        luna.push_task("find the lost star");
        let text = template.format(&luna.to_context()).unwrap();
        assert_eq!(
            text,
            "You are Luna. A curious moon spirit.\nCurrent task: find the lost star\n"
        );
    }

    #[test]
    fn test_to_message_is_system() {
        let template = SystemMessageTemplate::new("Hi {{ who }}").unwrap();
        let msg = template.to_message(&json!({"who": "there"})).unwrap();
        assert_eq!(msg.role(), &Role::System);
        assert_eq!(msg.text(), "Hi there");
    }

    #[test]
    fn test_from_template_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("system")).unwrap();
        std::fs::write(dir.path().join("system/narrator.jinja"), "I narrate for {{ name }}.").unwrap();

        let template = SystemMessageTemplate::from_template(dir.path(), "narrator").unwrap();
        assert_eq!(
            template.format(&json!({"name": "Luna"})).unwrap(),
            "I narrate for Luna."
        );
        assert!(matches!(
            SystemMessageTemplate::from_template(dir.path(), "missing"),
            Err(ConfigError::NotFound(_))
        ));
    }
}
