//! Conversation-to-prompt rendering.
//!
//! Turns an ordered list of messages into the single prompt string a
//! completion model expects:
//!
//! ```text
//! prefix + render(role_template, message) for each message + suffix
//! ```
//!
//! The prefix is rendered with an empty context, each message with a context
//! exposing its fields (both under `message.` and un-prefixed), and the suffix
//! with `next_message_name`.

use serde_json::{Value, json};
use tavern_types::error::PromptError;
use tavern_types::message::Message;
use tavern_types::template::TemplateProfile;

use super::engine::{RenderMode, render_template_string};
use super::profile::ProfileSource;

/// Marker emitted in place of messages whose role has no template.
pub const UNKNOWN_MESSAGE_MARKER: &str = "UNKNOWN MESSAGE TYPE";

/// Per-call rendering options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions<'a> {
    /// Name of whoever should speak next, exposed to the suffix template.
    pub next_message_name: Option<&'a str>,
    /// Strict (propagate template errors) or best-effort.
    pub mode: RenderMode,
}

impl<'a> RenderOptions<'a> {
    pub fn next_speaker(mut self, name: &'a str) -> Self {
        self.next_message_name = Some(name);
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.mode = RenderMode::BestEffort;
        self
    }
}

/// Renders conversations with profiles looked up from a [`ProfileSource`].
#[derive(Debug, Clone)]
pub struct PromptRenderer<S> {
    source: S,
}

impl<S: ProfileSource> PromptRenderer<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Render with default options (strict, no next speaker).
    pub fn render<'m>(
        &self,
        messages: impl IntoIterator<Item = &'m Message>,
        profile_name: &str,
    ) -> Result<String, PromptError> {
        self.render_with(messages, profile_name, RenderOptions::default())
    }

    pub fn render_with<'m>(
        &self,
        messages: impl IntoIterator<Item = &'m Message>,
        profile_name: &str,
        options: RenderOptions<'_>,
    ) -> Result<String, PromptError> {
        let profile = self.source.profile(profile_name)?;
        let prompt = render_messages(&profile, messages, options)?;
        tracing::debug!(profile = profile_name, "Messages to prompt:\n{prompt}");
        Ok(prompt)
    }
}

/// Render messages with an already loaded profile.
pub fn render_messages<'m>(
    profile: &TemplateProfile,
    messages: impl IntoIterator<Item = &'m Message>,
    options: RenderOptions<'_>,
) -> Result<String, PromptError> {
    let mode = options.mode;
    let mut prompt = render_template_string(&profile.prefix, &json!({}), mode)?;

    for message in messages {
        match profile.template_for(message.role()) {
            Some(template) => {
                let context = message_context(message);
                prompt.push_str(&render_template_string(template, &context, mode)?);
            }
            None => {
                tracing::warn!(role = %message.role(), "no template for message role");
                prompt.push_str(&format!("{UNKNOWN_MESSAGE_MARKER}: {}", message.role()));
            }
        }
    }

    let suffix_context = json!({ "next_message_name": options.next_message_name });
    prompt.push_str(&render_template_string(&profile.suffix, &suffix_context, mode)?);
    Ok(prompt)
}

fn message_context(message: &Message) -> Value {
    json!({
        "message": message,
        "text": message.text(),
        "name": message.name(),
        "role": message.role(),
        "token_count": message.token_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::profile::StaticProfiles;
    use tavern_types::message::Role;

    fn bracket_profile() -> TemplateProfile {
        TemplateProfile {
            prefix: "<start>".to_string(),
            suffix: "[{% if next_message_name %}{{ next_message_name }}{% else %}?{% endif %}]".to_string(),
            system_message: "(S {{ text }})".to_string(),
            user_message: "(U {{ message.name }}={{ message.text }})".to_string(),
            ai_message: "(A {{ name }}:{{ token_count }})".to_string(),
        }
    }

    fn renderer() -> PromptRenderer<StaticProfiles> {
        let mut profiles = StaticProfiles::builtin();
        profiles.insert("brackets", bracket_profile());
        PromptRenderer::new(profiles)
    }

    #[test]
    fn test_prefix_messages_suffix_in_order() {
        let messages = vec![
            Message::system("be nice"),
            Message::user("hi").with_name("Ana"),
            Message::ai("hello there"),
        ];
        let prompt = renderer().render(&messages, "brackets").unwrap();
        assert_eq!(prompt, "<start>(S be nice)(U Ana=hi)(A AI:2)[?]");
    }

    #[test]
    fn test_message_order_changes_output_order() {
        let a = Message::user("one");
        let b = Message::user("two");
        let forward = renderer().render([&a, &b], "brackets").unwrap();
        let backward = renderer().render([&b, &a], "brackets").unwrap();
        assert_eq!(forward, "<start>(U User=one)(U User=two)[?]");
        assert_eq!(backward, "<start>(U User=two)(U User=one)[?]");
    }

    #[test]
    fn test_next_message_name_reaches_suffix() {
        let options = RenderOptions::default().next_speaker("Luna");
        let prompt = renderer()
            .render_with(Vec::<&Message>::new(), "brackets", options)
            .unwrap();
        assert_eq!(prompt, "<start>[Luna]");
    }

    #[test]
    fn test_unknown_role_renders_marker() {
        let messages = vec![
            Message::user("hi"),
            Message::new(Role::Other("tool".to_string()), "{}"),
        ];
        let prompt = renderer().render(&messages, "brackets").unwrap();
        assert!(prompt.contains("UNKNOWN MESSAGE TYPE: tool"));
        assert!(prompt.starts_with("<start>(U User=hi)"));
    }

    #[test]
    fn test_missing_profile() {
        let err = renderer().render(&[Message::user("hi")], "nope").unwrap_err();
        assert!(matches!(err, PromptError::ConfigNotFound(_)));
    }

    #[test]
    fn test_template_error_strict_vs_best_effort() {
        let mut profiles = StaticProfiles::new();
        let mut profile = bracket_profile();
        profile.user_message = "(U {{ message.mood }})".to_string();
        profiles.insert("bad", profile);
        let renderer = PromptRenderer::new(profiles);
        let messages = [Message::user("hi")];

        let err = renderer.render(&messages, "bad").unwrap_err();
        assert!(matches!(err, PromptError::Template(_)));

        let prompt = renderer
            .render_with(&messages, "bad", RenderOptions::default().best_effort())
            .unwrap();
        assert_eq!(prompt, "<start>(U {{ message.mood }})[?]");
    }

    #[test]
    fn test_builtin_chatml() {
        let messages = vec![Message::system("You are Luna."), Message::user("Hi!")];
        let prompt = renderer()
            .render_with(&messages, "chatml", RenderOptions::default().next_speaker("Luna"))
            .unwrap();
        assert_eq!(
            prompt,
            "<|im_start|>system\nYou are Luna.<|im_end|>\n\
             <|im_start|>user\nUser: Hi!<|im_end|>\n\
             <|im_start|>assistant\nLuna:"
        );
    }
}
