//! Tavern CLI entry point.
//!
//! Binary name: `tavern`
//!
//! Parses CLI arguments, sets up tracing, loads the configuration, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,tavern=debug",
        _ => "trace",
    };
    tavern_observe::tracing_setup::init_tracing(filter, cli.otel)?;

    // Every exit path after init goes through here so exported spans are flushed
    let result = dispatch(&cli).await;
    tavern_observe::tracing_setup::shutdown_tracing();
    result
}

async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "tavern", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;
    run(&state, cli).await
}

async fn run(state: &AppState, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Render { conversation } => {
            cli::prompt::render(state, conversation, cli.json)?;
        }

        Commands::Complete {
            conversation,
            host,
            preset,
        } => {
            cli::prompt::complete(
                state,
                conversation,
                host.as_deref(),
                preset.as_deref(),
                cli.json,
                cli.quiet,
            )
            .await?;
        }

        Commands::Format { model, host } => {
            cli::model::format(state, model.as_deref(), host.as_deref(), cli.json).await?;
        }

        Commands::See {
            text,
            bot_name,
            user_name,
            adapter,
        } => {
            cli::vision::see(state, text, bot_name, user_name, adapter.as_deref(), cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[tokio::test]
    async fn test_completions_dispatch_without_app_state() {
        let cli = Cli::parse_from(["tavern", "completions", "bash"]);
        dispatch(&cli).await.unwrap();
    }

    #[test]
    fn test_model_conflicts_with_profile() {
        let parsed = Cli::try_parse_from([
            "tavern", "render", "-t", "chat.yaml", "--profile", "chatml", "--model", "llama-3",
        ]);
        assert!(parsed.is_err());
    }
}
