//! `format` command: which template profile a model uses.

use anyhow::{Context, Result};
use console::style;

use tavern_core::llm::CompletionBackend;
use tavern_infra::llm::create_completion_backend;

use crate::state::AppState;

/// Print the prompt format for `model`, or for the model the backend has
/// loaded when no name is given.
pub async fn format(state: &AppState, model: Option<&str>, host: Option<&str>, json: bool) -> Result<()> {
    let model = match model {
        Some(model) => model.to_string(),
        None => {
            let backend = create_completion_backend(&state.config, host);
            backend
                .loaded_model()
                .await
                .context("failed to query the loaded model")?
        }
    };

    let templates = state.model_templates()?;
    let prompt_format = templates.prompt_format_for_model(&model)?;

    if json {
        let output = serde_json::json!({
            "model": model,
            "prompt_format": prompt_format,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "  {} {} uses {}",
            style("▸").bold(),
            style(&model).cyan(),
            style(prompt_format).green().bold()
        );
    }
    Ok(())
}
