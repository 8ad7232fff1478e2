//! CLI interface for DbChat
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DbChat
///
/// Ask questions about a SQLite database in plain language. Each question is
/// routed to the SQL agent, the conversation memory, or answered directly.
#[derive(Parser, Debug)]
#[command(name = "dbchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store API keys in the OS keychain
    Setup,

    /// Start an interactive conversation
    Chat {
        /// Show the planner's decision for every question
        #[arg(long)]
        show_reasoning: bool,

        /// Do not keep a running conversation summary
        #[arg(long)]
        no_summary: bool,
    },

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// Show the planner's decision
        #[arg(long)]
        show_reasoning: bool,
    },

    /// List the database tables
    Tables {
        /// Rows to show for each previewed table
        #[arg(long, value_name = "ROWS")]
        preview: Option<u32>,
    },
}

/// Commands available inside `dbchat chat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    History,
    Summary,
    Tables,
    Quit,
    /// Anything starting with `/` that is not a known command
    Unknown(String),
    Question(String),
}

impl ReplCommand {
    /// Interpret one line of REPL input; blank lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let command = match line {
            "/history" => ReplCommand::History,
            "/summary" => ReplCommand::Summary,
            "/tables" => ReplCommand::Tables,
            "/quit" | "/exit" => ReplCommand::Quit,
            other if other.starts_with('/') => ReplCommand::Unknown(other.to_string()),
            other => ReplCommand::Question(other.to_string()),
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["dbchat", "setup"]);
        assert!(matches!(cli.command, Command::Setup));
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["dbchat", "--json", "--log", "debug", "tables"]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
    }

    #[test]
    fn test_ask_command() {
        let cli = Cli::parse_from(["dbchat", "ask", "Show the last 5 users", "--show-reasoning"]);
        if let Command::Ask {
            question,
            show_reasoning,
        } = cli.command
        {
            assert_eq!(question, "Show the last 5 users");
            assert!(show_reasoning);
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_chat_flags() {
        let cli = Cli::parse_from(["dbchat", "chat", "--no-summary"]);
        if let Command::Chat {
            show_reasoning,
            no_summary,
        } = cli.command
        {
            assert!(!show_reasoning);
            assert!(no_summary);
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_tables_preview() {
        let cli = Cli::parse_from(["dbchat", "tables", "--preview", "10"]);
        if let Command::Tables { preview } = cli.command {
            assert_eq!(preview, Some(10));
        } else {
            panic!("Expected Tables command");
        }
    }

    #[test]
    fn test_config_path_flag() {
        let cli = Cli::parse_from(["dbchat", "--config", "/tmp/dbchat.toml", "tables"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/dbchat.toml")));
    }

    #[test]
    fn test_repl_commands() {
        assert_eq!(ReplCommand::parse("  "), None);
        assert_eq!(ReplCommand::parse("/history"), Some(ReplCommand::History));
        assert_eq!(ReplCommand::parse("/quit"), Some(ReplCommand::Quit));
        assert_eq!(
            ReplCommand::parse("/nope"),
            Some(ReplCommand::Unknown("/nope".to_string()))
        );
        assert_eq!(
            ReplCommand::parse(" What did you show me before? "),
            Some(ReplCommand::Question("What did you show me before?".to_string()))
        );
    }
}
