//! CLI command definitions and dispatch for the `tavern` binary.
//!
//! Uses clap derive macros for argument parsing. Each verb works on a
//! transcript file or plain arguments; nothing is persisted between runs.

pub mod model;
pub mod prompt;
pub mod transcript;
pub mod vision;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Render prompts, run completions and caption images for chat bots.
#[derive(Parser)]
#[command(name = "tavern", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a transcript into a prompt string.
    Render {
        #[command(flatten)]
        conversation: ConversationArgs,
    },

    /// Render a transcript and ask the completion backend for the next turn.
    Complete {
        #[command(flatten)]
        conversation: ConversationArgs,

        /// Backend host (overrides `backend_host` from config.toml).
        #[arg(long, env = "TAVERN_BACKEND_HOST")]
        host: Option<String>,

        /// Generation preset name (`<presets_dir>/<name>.yaml`).
        #[arg(long)]
        preset: Option<String>,
    },

    /// Print the prompt format (template profile) for a model name.
    Format {
        /// Model name; asks the backend for its loaded model when omitted.
        #[arg(long)]
        model: Option<String>,

        /// Backend host used when no model is given.
        #[arg(long, env = "TAVERN_BACKEND_HOST")]
        host: Option<String>,
    },

    /// Replace image and other URLs in text with vision notes.
    See {
        /// Chat text containing URLs or attachment paths.
        #[arg(long)]
        text: String,

        /// Name the notes use for the bot.
        #[arg(long, default_value = "you")]
        bot_name: String,

        /// Name the notes use for the user.
        #[arg(long, default_value = "user")]
        user_name: String,

        /// Chat adapter whose base site resolves relative attachment paths.
        #[arg(long)]
        adapter: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Inputs shared by `render` and `complete`.
#[derive(Args, Debug, Clone)]
pub struct ConversationArgs {
    /// YAML transcript: a list of `{role, text, name?, pinned?}` entries, or
    /// a document with `character` and `messages`.
    #[arg(long, short)]
    pub transcript: PathBuf,

    /// Template profile (defaults to `default_profile` from config.toml).
    #[arg(long, short)]
    pub profile: Option<String>,

    /// Resolve the template profile from a model name instead.
    #[arg(long, conflicts_with = "profile")]
    pub model: Option<String>,

    /// Sliding-window token limit (0 = unbounded).
    #[arg(long)]
    pub token_limit: Option<usize>,

    /// Hard cap on stored messages (0 = unbounded).
    #[arg(long)]
    pub keep_max: Option<usize>,

    /// Name of the next speaker (defaults to the character's name).
    #[arg(long)]
    pub next: Option<String>,

    /// System template (`<templates_dir>/system/<name>.jinja`) pinned in
    /// front of the conversation, rendered with the character as context.
    #[arg(long)]
    pub system: Option<String>,

    /// Fall back to raw template text instead of failing on template errors.
    #[arg(long)]
    pub best_effort: bool,
}
