// DbChat
// Main entry point for the dbchat binary

use clap::Parser;
use dbchat_engine::cli::{Cli, Command};
use dbchat_engine::config::Config;
use dbchat_engine::handlers::{handle_ask, handle_chat, handle_setup, handle_tables, OutputFormat};
use dbchat_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let loaded = match &cli.config {
        Some(config_path) => Config::load_from_path(config_path),
        None => Config::load_or_create(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            init_telemetry();
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // --log wins over the config file; RUST_LOG wins over both.
    // Installed once: only the first subscriber sticks.
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("DbChat v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Setup => {
            tracing::info!("Running setup...");
            handle_setup(&config).await
        }

        Command::Chat {
            show_reasoning,
            no_summary,
        } => {
            tracing::info!("Starting chat session");
            handle_chat(&config, show_reasoning, no_summary).await
        }

        Command::Ask {
            question,
            show_reasoning,
        } => {
            tracing::info!("Answering question: {}", question);
            handle_ask(question, &config, show_reasoning, format).await
        }

        Command::Tables { preview } => {
            tracing::info!("Listing tables");
            handle_tables(&config, preview, format).await
        }
    }
}
