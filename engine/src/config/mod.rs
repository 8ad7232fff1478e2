//! Configuration management
//!
//! This module handles loading, validation, and management of the DbChat configuration.
//! Configuration is stored in TOML format at ~/.dbchat/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **llm**: Provider selection, temperatures, per-provider settings
//! - **database**: SQLite file or PostgreSQL URL, preview/row limits
//! - **memory**: Summary memory toggle
//! - **session**: Chat display preferences
//!
//! # Path Expansion
//!
//! `~` in `core.data_dir` and `database.path` is expanded to the user's home
//! directory. The data directory is created if it doesn't exist; the database
//! file is not, since connecting to a missing database is an error worth reporting.
//!
//! # Examples
//!
//! ```no_run
//! use dbchat_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Database: {:?}", config.database.path);
//! println!("Default provider: {}", config.llm.default_provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Providers the engine knows how to build
pub const VALID_PROVIDERS: [&str; 2] = ["ollama", "openai"];

/// Log levels accepted by `core.log_level` and `--log`
pub const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// LLM provider configuration
    pub llm: LLMConfig,

    /// Database connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Chat session preferences
    #[serde(default)]
    pub session: SessionConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (ollama, openai)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Sampling temperature for the answering model (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Sampling temperature for the dispatch (planner) model (0.0-1.0)
    #[serde(default = "default_planner_temperature")]
    pub planner_temperature: f64,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key stored in OS keychain (or OPENAI_API_KEY), not in config
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL server, e.g. `postgres://user@localhost:5432/shop`.
    /// Takes precedence over `path` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// SQLite database file (supports ~ expansion)
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Rows shown per table preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: u32,

    /// Number of tables previewed after connecting
    #[serde(default = "default_preview_tables")]
    pub preview_tables: usize,

    /// Row cap for queries run by the SQL agent
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: default_database_path(),
            preview_rows: default_preview_rows(),
            preview_tables: default_preview_tables(),
            max_rows: default_max_rows(),
        }
    }
}

impl DatabaseConfig {
    /// Where the data lives, for display. URL passwords are masked.
    pub fn location(&self) -> String {
        match &self.url {
            Some(url) => crate::secrets::SecretManager::scrub(url),
            None => self.path.display().to_string(),
        }
    }
}

/// Memory system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Refresh a running conversation summary after every turn
    #[serde(default = "default_true")]
    pub use_summary: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            use_summary: default_true(),
        }
    }
}

/// Chat session preferences
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Show the dispatcher's decision and reasoning for each question
    #[serde(default)]
    pub show_reasoning: bool,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.dbchat")
}

fn default_temperature() -> f64 {
    0.1
}

fn default_planner_temperature() -> f64 {
    0.1
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ollama_model() -> String {
    "llama3".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("~/.dbchat/data.db")
}

fn default_preview_rows() -> u32 {
    5
}

fn default_preview_tables() -> usize {
    3
}

fn default_max_rows() -> usize {
    50
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            temperature: default_temperature(),
            planner_temperature: default_planner_temperature(),
            ollama: OllamaConfig::default(),
            openai: OpenAIConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.dbchat/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse, validate and process configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        // Written before path expansion so the file keeps the portable ~ form
        let toml_string = toml::to_string_pretty(&Self::default_config())
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, &toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Self::from_toml_str(&toml_string)
    }

    /// Get the default configuration file path (~/.dbchat/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".dbchat").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
            },
            llm: LLMConfig::default(),
            database: DatabaseConfig::default(),
            memory: MemoryConfig::default(),
            session: SessionConfig::default(),
        }
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level, provider, temperatures and limits
    /// - Expands ~ in paths
    /// - Creates the data directory if it doesn't exist
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        self.validate()?;

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        self.database.path = expand_path(&self.database.path)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }

    /// Check field values without touching the file system
    pub fn validate(&self) -> Result<(), EngineError> {
        if !VALID_LOG_LEVELS.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if !VALID_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                VALID_PROVIDERS.join(", ")
            )));
        }

        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.llm.planner_temperature) {
            return Err(EngineError::Config(
                "planner_temperature must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.database.preview_rows == 0 {
            return Err(EngineError::Config(
                "preview_rows must be at least 1".to_string(),
            ));
        }
        if self.database.max_rows == 0 {
            return Err(EngineError::Config("max_rows must be at least 1".to_string()));
        }

        if let Some(url) = &self.database.url {
            if !crate::db::is_postgres_url(url) {
                return Err(EngineError::Config(
                    "database.url must start with postgres:// or postgresql://".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
///
/// # Examples
///
/// ```ignore
/// let path = PathBuf::from("~/.dbchat");
/// let expanded = expand_path(&path)?;
/// // expanded is now /home/user/.dbchat (on Unix)
/// ```
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
