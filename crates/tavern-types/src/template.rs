//! Template profile types.
//!
//! A template profile describes how one model family expects a conversation
//! to be laid out as a single prompt string: a prefix, one template per role,
//! and a suffix. Profiles are stored as YAML:
//!
//! ```yaml
//! prefix: ""
//! SystemMessage: "<|im_start|>system\n{{ message.text }}<|im_end|>\n"
//! UserMessage: "<|im_start|>user\n{{ message.text }}<|im_end|>\n"
//! AIMessage: "<|im_start|>assistant\n{{ message.text }}<|im_end|>\n"
//! suffix: "<|im_start|>assistant\n"
//! ```

use serde::{Deserialize, Serialize};

use crate::message::Role;

/// A named bundle of string templates for one prompt format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateProfile {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(rename = "SystemMessage")]
    pub system_message: String,
    #[serde(rename = "UserMessage")]
    pub user_message: String,
    #[serde(rename = "AIMessage")]
    pub ai_message: String,
}

impl TemplateProfile {
    /// Template for a role, or `None` for extension roles.
    pub fn template_for(&self, role: &Role) -> Option<&str> {
        match role {
            Role::System => Some(&self.system_message),
            Role::User => Some(&self.user_message),
            Role::Ai => Some(&self.ai_message),
            Role::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHATML: &str = r#"
prefix: ""
SystemMessage: "<|im_start|>system\n{{ message.text }}<|im_end|>\n"
UserMessage: "<|im_start|>user\n{{ message.text }}<|im_end|>\n"
AIMessage: "<|im_start|>assistant\n{{ message.text }}<|im_end|>\n"
suffix: "<|im_start|>assistant\n"
"#;

    #[test]
    fn test_profile_yaml_uses_role_keys() {
        let profile: TemplateProfile = serde_yaml_ng::from_str(CHATML).unwrap();
        assert!(profile.system_message.starts_with("<|im_start|>system"));
        assert!(profile.ai_message.contains("assistant"));
        assert_eq!(profile.suffix, "<|im_start|>assistant\n");
    }

    #[test]
    fn test_template_for_role() {
        let profile: TemplateProfile = serde_yaml_ng::from_str(CHATML).unwrap();
        assert!(profile.template_for(&Role::User).unwrap().contains("user"));
        assert!(profile.template_for(&Role::Other("tool".into())).is_none());
    }

    #[test]
    fn test_missing_role_template_is_rejected() {
        let result: Result<TemplateProfile, _> = serde_yaml_ng::from_str("prefix: x\nsuffix: y\n");
        assert!(result.is_err());
    }
}
