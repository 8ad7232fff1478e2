//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: interactive conversation
//! - ask: answer a single question
//! - tables: list and preview the database tables
//! - setup: store API keys in the OS keychain

use anyhow::{Context, Result};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{LlmSummarizer, SqlAgent};
use crate::cli::ReplCommand;
use crate::conductor::{
    Capabilities, ConversationObserver, Decision, Orchestrator, SessionState,
};
use crate::config::Config;
use crate::db::{Database, DATABASE_PASSWORD};
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::{OpenAIProvider, OPENAI_API_KEY};
use crate::llm::router::LLMRouter;
use crate::llm::LLMProvider;
use crate::secrets::{SecretCache, SecretManager};
use sdk::capabilities::LanguageModel;

/// Keychain service holding DbChat's secrets
pub const SECRET_SERVICE: &str = "dbchat";

/// Characters of each turn shown by `/history`
const HISTORY_PREVIEW_CHARS: usize = 100;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Prints the planner's decision and fallback notices to the terminal
pub struct TerminalObserver;

impl ConversationObserver for TerminalObserver {
    fn on_decision(&self, decision: &Decision) {
        println!("Reasoning: {}", decision.reasoning);
        println!("Action: {}", decision.action);
        println!("Explanation: {}", decision.explanation);
        println!();
    }

    fn on_notice(&self, notice: &str) {
        println!("{}", notice);
        println!();
    }
}

/// Build a failover router over the available providers
///
/// Ollama is always registered. OpenAI is only added when its API key is
/// already available, so nothing prompts during a conversation.
pub fn build_router(
    config: &Config,
    temperature: f64,
    secret_manager: &SecretManager,
    secret_cache: &Arc<SecretCache>,
) -> LLMRouter {
    let mut providers: Vec<Box<dyn LLMProvider>> = vec![Box::new(
        OllamaProvider::new(
            config.llm.ollama.base_url.clone(),
            config.llm.ollama.model.clone(),
        )
        .with_temperature(temperature),
    )];

    if secret_manager.has_secret(OPENAI_API_KEY) {
        providers.push(Box::new(
            OpenAIProvider::new(config.llm.openai.clone(), Arc::clone(secret_cache))
                .with_temperature(temperature),
        ));
    } else if config.llm.default_provider == "openai" {
        tracing::warn!("OpenAI is the default provider but no API key is stored. Run `dbchat setup`.");
    }

    LLMRouter::new(providers, config.llm.default_provider.clone())
}

/// Open the configured database
///
/// For PostgreSQL the password comes from `DATABASE_PASSWORD` or the keychain
/// when one is stored, otherwise from the URL itself.
pub async fn open_database(config: &Config, secret_manager: &SecretManager) -> Result<Database> {
    let password = if config.database.url.is_some() {
        secret_manager.get_secret(DATABASE_PASSWORD).ok()
    } else {
        None
    };

    Database::open(&config.database, password.as_deref())
        .await
        .context("Failed to open database")
}

/// Connect to the configured database and wire up a ready session
pub async fn connect_session(config: &Config, summary_mode: bool) -> Result<(SessionState, Arc<Database>)> {
    let secret_manager = Arc::new(SecretManager::new(SECRET_SERVICE));
    let database = Arc::new(open_database(config, &secret_manager).await?);
    tracing::info!("Connected to {} database", database.backend());

    let secret_cache = Arc::new(SecretCache::new(Arc::clone(&secret_manager)));

    let llm = Arc::new(build_router(
        config,
        config.llm.temperature,
        &secret_manager,
        &secret_cache,
    ));
    let planner = Arc::new(build_router(
        config,
        config.llm.planner_temperature,
        &secret_manager,
        &secret_cache,
    ));
    tracing::info!("LLM providers: {}", llm.provider_names().join(", "));
    let llm: Arc<dyn LanguageModel> = llm;

    let capabilities = Capabilities {
        llm: Arc::clone(&llm),
        planner,
        database: Arc::new(
            SqlAgent::new(Arc::clone(&database), Arc::clone(&llm))
                .with_max_rows(config.database.max_rows),
        ),
        summarizer: Some(Arc::new(LlmSummarizer::new(llm))),
    };

    let session = SessionState::with_capabilities(capabilities).with_summary_mode(summary_mode);
    Ok((session, database))
}

/// Interactive conversation
pub async fn handle_chat(config: &Config, show_reasoning: bool, no_summary: bool) -> Result<()> {
    let summary_mode = config.memory.use_summary && !no_summary;
    let verbose = show_reasoning || config.session.show_reasoning;

    let (mut session, database) = match connect_session(config, summary_mode).await {
        Ok((session, database)) => (session, Some(database)),
        Err(e) => {
            eprintln!("{:#}", e);
            (SessionState::new().with_summary_mode(summary_mode), None)
        }
    };

    let orchestrator = Orchestrator::with_observer(Arc::new(TerminalObserver));

    println!("DbChat: ask a question about {}", config.database.location());
    println!("Commands: /history, /summary, /tables, /quit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(command) = ReplCommand::parse(&line) else {
            continue;
        };

        match command {
            ReplCommand::Quit => break,
            ReplCommand::History => print_history(&session),
            ReplCommand::Summary => match session.memory().summary() {
                Some(summary) => println!("{}", summary),
                None => println!("No summary yet."),
            },
            ReplCommand::Tables => match &database {
                Some(database) => print_tables(database, config, None).await?,
                None => println!("{}", crate::conductor::ConductorError::NotInitialized),
            },
            ReplCommand::Unknown(other) => println!("Unknown command: {}", other),
            ReplCommand::Question(question) => {
                match orchestrator
                    .handle_user_question(&mut session, &question, verbose)
                    .await
                {
                    Ok(answer) => println!("{}", answer),
                    Err(e) => eprintln!("Error: {}", SecretManager::scrub(&e.to_string())),
                }
            }
        }
        println!();
    }

    // The SQL agent inside the session holds the other reference
    drop(session);
    if let Some(database) = database {
        if let Ok(database) = Arc::try_unwrap(database) {
            database.close().await;
        }
    }
    Ok(())
}

/// Answer one question and exit
pub async fn handle_ask(
    question: String,
    config: &Config,
    show_reasoning: bool,
    format: OutputFormat,
) -> Result<()> {
    let (mut session, _database) = connect_session(config, false).await?;
    let verbose = show_reasoning || config.session.show_reasoning;

    match format {
        OutputFormat::Text => {
            let orchestrator = Orchestrator::with_observer(Arc::new(TerminalObserver));
            let answer = orchestrator
                .handle_user_question(&mut session, &question, verbose)
                .await
                .map_err(|e| anyhow::anyhow!(SecretManager::scrub(&e.to_string())))?;
            println!("{}", answer);
        }
        OutputFormat::Json => {
            let exchange = Orchestrator::new()
                .process_question(&mut session, &question, false)
                .await
                .map_err(|e| anyhow::anyhow!(SecretManager::scrub(&e.to_string())))?;
            let output = json!({
                "question": question,
                "action": exchange.decision.action,
                "reasoning": exchange.decision.reasoning,
                "explanation": exchange.decision.explanation,
                "source": exchange.decision.source,
                "answer": exchange.answer,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// List tables and preview the first few
pub async fn handle_tables(config: &Config, preview: Option<u32>, format: OutputFormat) -> Result<()> {
    let database = open_database(config, &SecretManager::new(SECRET_SERVICE)).await?;

    match format {
        OutputFormat::Text => print_tables(&database, config, preview).await?,
        OutputFormat::Json => {
            let tables = database.table_names().await?;
            let rows = preview.unwrap_or(config.database.preview_rows) as usize;

            let mut previews = serde_json::Map::new();
            for table in tables.iter().take(config.database.preview_tables) {
                let value = match database.preview(table, rows).await {
                    Ok(result) => serde_json::to_value(result)?,
                    Err(e) => json!({ "error": format!("{:#}", e) }),
                };
                previews.insert(table.clone(), value);
            }

            let output = json!({
                "database": config.database.location(),
                "backend": database.backend(),
                "tables": tables,
                "previews": previews,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    database.close().await;
    Ok(())
}

async fn print_tables(database: &Database, config: &Config, preview: Option<u32>) -> Result<()> {
    let tables = database.table_names().await?;
    if tables.is_empty() {
        println!("No tables found in {}", config.database.location());
        return Ok(());
    }

    println!("Tables ({}):", tables.len());
    for table in &tables {
        println!("  {}", table);
    }

    let rows = preview.unwrap_or(config.database.preview_rows) as usize;
    for table in tables.iter().take(config.database.preview_tables) {
        println!();
        println!("{} (first {} rows):", table, rows);
        match database.preview(table, rows).await {
            Ok(result) => println!("{}", result),
            Err(e) => println!("Error querying {}: {:#}", table, e),
        }
    }
    Ok(())
}

fn print_history(session: &SessionState) {
    let memory = session.memory();
    if memory.is_empty() {
        println!("No conversation yet.");
        return;
    }

    for turn in memory.turns() {
        println!("{}: {}", turn.role(), truncate(turn.content(), HISTORY_PREVIEW_CHARS));
    }
    if let Some(summary) = memory.summary() {
        println!();
        println!("Summary: {}", summary);
    }
}

/// First `max_chars` characters of `text`, with an ellipsis when cut
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Store API keys in the OS keychain and report provider health
pub async fn handle_setup(config: &Config) -> Result<()> {
    println!("=== DbChat Setup ===");
    println!();
    println!("Ollama runs locally and needs no key ({}).", config.llm.ollama.base_url);

    let secret_manager = SecretManager::new(SECRET_SERVICE);
    if secret_manager.has_secret(OPENAI_API_KEY) {
        println!("An OpenAI API key is already configured.");
    } else {
        let stored = secret_manager
            .prompt_and_store(OPENAI_API_KEY, "OpenAI API key")
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        if stored {
            println!("    Stored in keychain.");
        }
    }

    if config.database.url.is_some() {
        if secret_manager.has_secret(DATABASE_PASSWORD) {
            println!("A database password is already configured.");
        } else {
            let stored = secret_manager
                .prompt_and_store(DATABASE_PASSWORD, "PostgreSQL password")
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            if stored {
                println!("    Stored in keychain.");
            }
        }
    }

    let secret_manager = Arc::new(secret_manager);
    let secret_cache = Arc::new(SecretCache::new(Arc::clone(&secret_manager)));
    let router = build_router(config, config.llm.temperature, &secret_manager, &secret_cache);

    println!();
    println!("Providers:");
    for (name, healthy) in router.check_health().await {
        println!(
            "  {:<8} {}",
            name,
            if healthy { "available" } else { "unavailable" }
        );
    }
    println!();
    println!("Database: {}", config.database.location());
    Ok(())
}
