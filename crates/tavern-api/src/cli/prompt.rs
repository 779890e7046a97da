//! `render` and `complete` commands.

use anyhow::{Context, Result};
use console::style;
use serde_json::json;
use tracing::info_span;

use tavern_core::chat::ChatSession;
use tavern_core::memory::{MemoryStore, SlidingWindowMemory};
use tavern_core::prompt::renderer::RenderOptions;
use tavern_infra::llm::create_completion_backend;
use tavern_observe::genai_attrs::OP_RENDER_PROMPT;
use tavern_types::character::Character;
use tavern_types::llm::Parameters;
use tavern_types::message::Role;

use super::ConversationArgs;
use super::transcript::{Transcript, TranscriptEntry};
use crate::state::AppState;

/// Template profile for a conversation: `--model` through the model
/// templates, else `--profile`, else the configured default.
pub fn resolve_profile(state: &AppState, args: &ConversationArgs) -> Result<String> {
    if let Some(model) = &args.model {
        let templates = state.model_templates()?;
        let format = templates
            .prompt_format_for_model(model)
            .with_context(|| format!("no prompt format for model '{model}'"))?;
        return Ok(format.to_string());
    }
    Ok(args
        .profile
        .clone()
        .unwrap_or_else(|| state.config.default_profile.clone()))
}

/// Load the transcript into a sliding-window session.
///
/// The `--system` template, if any, is rendered with the character as
/// context and pinned in front of the transcript. `--next` renames the
/// speaker of the AI turns.
pub fn load_session(state: &AppState, args: &ConversationArgs) -> Result<ChatSession<SlidingWindowMemory>> {
    let mut transcript = Transcript::load(&args.transcript)?;

    if let Some(name) = &args.system {
        let template = state.system_template(name)?;
        let context = transcript
            .character
            .as_ref()
            .map(Character::to_context)
            .unwrap_or_else(|| json!({}));
        let text = template
            .format(&context)
            .with_context(|| format!("failed to render system template '{name}'"))?;
        transcript.messages.insert(
            0,
            TranscriptEntry {
                role: Role::System,
                text,
                name: None,
                pinned: true,
            },
        );
    }

    let token_limit = args.token_limit.unwrap_or(state.config.token_limit);
    let keep_max = args.keep_max.unwrap_or(state.config.keep_max);
    let mut session = transcript.into_session(token_limit, keep_max);

    if let Some(next) = &args.next {
        match session.character_mut() {
            Some(character) => character.name = next.clone(),
            None => session = session.with_character(Character::new(next.clone())),
        }
    }

    tracing::debug!(
        token_limit,
        keep_max,
        stored = session.memory().messages_all().len(),
        pinned = session.memory().pinned_messages().len(),
        "loaded transcript"
    );
    Ok(session)
}

/// Print the prompt a completion model would receive for the transcript.
pub fn render(state: &AppState, args: &ConversationArgs, json: bool) -> Result<()> {
    let profile = resolve_profile(state, args)?;
    let session = load_session(state, args)?;
    let renderer = state.renderer();

    let mut options = RenderOptions::default().next_speaker(session.ai_name());
    if args.best_effort {
        options = options.best_effort();
    }

    let messages = session.memory().messages();
    let prompt = {
        let span = info_span!(
            "render_prompt",
            gen_ai.operation.name = OP_RENDER_PROMPT,
            tavern.profile = %profile,
            tavern.messages = messages.len(),
        );
        let _guard = span.enter();
        renderer.render_with(messages.iter().copied(), &profile, options)?
    };

    if json {
        let output = json!({
            "profile": profile,
            "messages": messages.len(),
            "next_message_name": session.ai_name(),
            "prompt": prompt,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{prompt}");
    }
    Ok(())
}

/// Render the transcript, ask the completion backend for the next turn and
/// print the reply.
pub async fn complete(
    state: &AppState,
    args: &ConversationArgs,
    host: Option<&str>,
    preset: Option<&str>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    if args.best_effort {
        tracing::warn!("--best-effort only applies to `render`, ignoring");
    }

    let profile = resolve_profile(state, args)?;
    let mut session = load_session(state, args)?;
    let renderer = state.renderer();
    let parameters = match preset {
        Some(name) => state.presets().load(name)?,
        None => Parameters::new(),
    };
    let backend = create_completion_backend(&state.config, host);

    let reply = session
        .respond_with_completion(&backend, &renderer, &profile, &parameters)
        .await?;

    if json {
        let output = json!({
            "profile": profile,
            "name": reply.name(),
            "text": reply.text(),
            "token_count": reply.token_count(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if quiet {
        println!("{}", reply.text());
    } else {
        println!("{}: {}", style(reply.name()).cyan().bold(), reply.text());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use tavern_types::config::TavernConfig;

    fn state_in(dir: &Path) -> AppState {
        AppState {
            data_dir: dir.to_path_buf(),
            config: TavernConfig::default(),
        }
    }

    fn args(transcript: PathBuf) -> ConversationArgs {
        ConversationArgs {
            transcript,
            profile: None,
            model: None,
            token_limit: None,
            keep_max: None,
            next: None,
            system: None,
            best_effort: false,
        }
    }

    #[test]
    fn test_resolve_profile_order() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("model_templates.yaml"),
            "\"llama-?3.*instruct\":\n  prompt_format: llama3-instruct\n",
        )
        .unwrap();
        let state = state_in(tmp.path());

        let mut conversation = args(PathBuf::from("unused.yaml"));
        assert_eq!(resolve_profile(&state, &conversation).unwrap(), "chatml");

        conversation.profile = Some("alpaca".into());
        assert_eq!(resolve_profile(&state, &conversation).unwrap(), "alpaca");

        conversation.profile = None;
        conversation.model = Some("Llama-3-8B-Instruct".into());
        assert_eq!(resolve_profile(&state, &conversation).unwrap(), "llama3-instruct");

        conversation.model = Some("mistral-7b".into());
        assert!(resolve_profile(&state, &conversation).is_err());
    }

    #[test]
    fn test_system_template_is_pinned_first() {
        let tmp = tempfile::tempdir().unwrap();
        let system_dir = tmp.path().join("templates").join("system");
        std::fs::create_dir_all(&system_dir).unwrap();
        std::fs::write(system_dir.join("persona.jinja"), "You are {{ name }}.").unwrap();
        let transcript = tmp.path().join("chat.yaml");
        std::fs::write(
            &transcript,
            "character:\n  name: Luna\nmessages:\n  - { role: user, text: Hi }\n",
        )
        .unwrap();

        let state = state_in(tmp.path());
        let mut conversation = args(transcript);
        conversation.system = Some("persona".into());
        let session = load_session(&state, &conversation).unwrap();

        let view: Vec<&str> = session.memory().messages().iter().map(|m| m.text()).collect();
        assert_eq!(view, vec!["You are Luna.", "Hi"]);
    }

    #[test]
    fn test_next_speaker_without_character() {
        let tmp = tempfile::tempdir().unwrap();
        let transcript = tmp.path().join("chat.yaml");
        std::fs::write(&transcript, "- { role: user, text: Hi }\n").unwrap();

        let state = state_in(tmp.path());
        let mut conversation = args(transcript);
        assert_eq!(load_session(&state, &conversation).unwrap().ai_name(), "AI");

        conversation.next = Some("Bob".into());
        assert_eq!(load_session(&state, &conversation).unwrap().ai_name(), "Bob");
    }

    #[test]
    fn test_token_limit_override() {
        let tmp = tempfile::tempdir().unwrap();
        let transcript = tmp.path().join("chat.yaml");
        std::fs::write(
            &transcript,
            "- { role: user, text: \"one two three four\" }\n- { role: user, text: \"five six\" }\n",
        )
        .unwrap();

        let state = state_in(tmp.path());
        let mut conversation = args(transcript);
        conversation.token_limit = Some(3);
        let session = load_session(&state, &conversation).unwrap();
        assert_eq!(session.memory().messages().len(), 1);
    }
}
