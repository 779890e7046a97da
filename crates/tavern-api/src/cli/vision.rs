//! `see` command: rewrite chat text for a text-only model.

use anyhow::Result;

use tavern_infra::vision::Vision;

use crate::state::AppState;

pub async fn see(
    state: &AppState,
    text: &str,
    bot_name: &str,
    user_name: &str,
    adapter: Option<&str>,
    json: bool,
) -> Result<()> {
    let vision = Vision::new(state.config.vision.clone());
    let seen = vision.see(text, bot_name, user_name, adapter).await;

    if json {
        let output = serde_json::json!({
            "text": seen,
            "changed": seen != text,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{seen}");
    }
    Ok(())
}
