// SPDX-FileCopyrightText: 2026 Kontext Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kontext - a context-window aware chat client.
//!
//! This is the binary entry point.

mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use kontext_config::KontextConfig;
use kontext_core::{KontextError, Provider};

use crate::app::App;

/// Kontext - chat with LLMs without running out of context.
#[derive(Parser, Debug)]
#[command(name = "kontext", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the supported models.
    Models,
    /// List conversations, newest first.
    List,
    /// Start a new conversation.
    New {
        /// Model key to use instead of the default.
        #[arg(long)]
        model: Option<String>,
    },
    /// Print a conversation.
    Show { id: String },
    /// Send a message and print the reply.
    Send { id: String, text: String },
    /// Show context window usage.
    Usage { id: String },
    /// Summarize older messages now.
    Compress { id: String },
    /// Draft a summary of the whole conversation.
    Summarize {
        id: String,
        /// Use this text instead of asking the model for a draft.
        #[arg(long)]
        text: Option<String>,
        /// Store the summary on the conversation.
        #[arg(long)]
        save: bool,
        /// Store the summary and continue in a new conversation seeded with it.
        #[arg(long, conflicts_with = "save")]
        start_fresh: bool,
    },
    /// Rename a conversation.
    Rename { id: String, title: String },
    /// Delete a conversation.
    Delete { id: String },
    /// Export a conversation as JSON.
    Export {
        id: String,
        /// Directory to write into.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Store an API key in the vault. An empty key removes it.
    SetKey { provider: Provider },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration and print the effective values.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => kontext_config::load_and_validate_path(path),
        None => kontext_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            kontext_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.app.log_level);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &KontextConfig) -> Result<(), KontextError> {
    // Commands that need neither the database nor the vault.
    match command {
        Commands::Models => {
            commands::models();
            return Ok(());
        }
        Commands::Config {
            action: ConfigCommand::Check,
        } => {
            commands::config_check(config);
            return Ok(());
        }
        _ => {}
    }

    let app = App::open(config).await?;
    let result = match command {
        Commands::List => {
            commands::list(&app);
            Ok(())
        }
        Commands::New { model } => commands::new_conversation(&app, model.as_deref()),
        Commands::Show { id } => commands::show(&app, &id),
        Commands::Send { id, text } => commands::send(&app, &id, &text).await,
        Commands::Usage { id } => commands::usage(&app, &id),
        Commands::Compress { id } => commands::compress(&app, &id).await,
        Commands::Summarize {
            id,
            text,
            save,
            start_fresh,
        } => commands::summarize(&app, &id, text, save, start_fresh).await,
        Commands::Rename { id, title } => commands::rename(&app, &id, &title),
        Commands::Delete { id } => commands::delete(&app, &id),
        Commands::Export { id, out } => commands::export(&app, &id, &out),
        Commands::SetKey { provider } => commands::set_key(&app, provider).await,
        Commands::Models | Commands::Config { .. } => Ok(()),
    };
    app.close().await;
    result
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kontext={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_summarize_flags() {
        let cli = Cli::try_parse_from(["kontext", "summarize", "abc", "--start-fresh"]).unwrap();
        match cli.command {
            Commands::Summarize {
                id,
                save,
                start_fresh,
                text,
            } => {
                assert_eq!(id, "abc");
                assert!(!save);
                assert!(start_fresh);
                assert!(text.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["kontext", "summarize", "abc", "--save", "--start-fresh"]).is_err());
    }

    #[test]
    fn parses_provider_names() {
        let cli = Cli::try_parse_from(["kontext", "set-key", "anthropic"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::SetKey {
                provider: Provider::Anthropic
            }
        ));
        assert!(Cli::try_parse_from(["kontext", "set-key", "mistral"]).is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = kontext_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.chat.default_model, "gpt-4o");
    }
}
