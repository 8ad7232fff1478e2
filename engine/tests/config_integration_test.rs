//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be properly loaded,
//! validated, and processed with path expansion.

use dbchat_engine::config::Config;
use std::fs;
use tempfile::TempDir;

fn full_config(data_dir: &str) -> String {
    format!(
        r#"
[core]
log_level = "debug"
data_dir = "{data_dir}"

[llm]
default_provider = "openai"
temperature = 0.3
planner_temperature = 0.0

[llm.ollama]
base_url = "http://localhost:11434"
model = "mistral"

[llm.openai]
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"

[database]
path = "{data_dir}/shop.db"
preview_rows = 10
preview_tables = 2
max_rows = 100

[memory]
use_summary = false

[session]
show_reasoning = true
"#
    )
}

#[test]
fn test_load_full_config_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, full_config(&data_dir.display().to_string())).unwrap();

    let config = Config::load_from_path(&config_path).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_provider, "openai");
    assert_eq!(config.llm.temperature, 0.3);
    assert_eq!(config.llm.planner_temperature, 0.0);
    assert_eq!(config.llm.ollama.model, "mistral");
    assert_eq!(config.llm.openai.model, "gpt-4o-mini");
    assert_eq!(config.database.path, data_dir.join("shop.db"));
    assert_eq!(config.database.preview_rows, 10);
    assert_eq!(config.database.preview_tables, 2);
    assert_eq!(config.database.max_rows, 100);
    assert!(!config.memory.use_summary);
    assert!(config.session.show_reasoning);

    // The data directory is created, the database file is not
    assert!(data_dir.is_dir());
    assert!(!config.database.path.exists());
}

#[test]
fn test_minimal_config_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");
    let toml = format!(
        "[core]\ndata_dir = \"{}\"\n\n[llm]\n",
        data_dir.display()
    );

    let config = Config::from_toml_str(&toml).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.llm.default_provider, "ollama");
    assert_eq!(config.llm.ollama.base_url, "http://localhost:11434");
    assert_eq!(config.llm.ollama.model, "llama3");
    assert_eq!(config.llm.openai.model, "gpt-3.5-turbo");
    assert_eq!(config.database.preview_rows, 5);
    assert_eq!(config.database.preview_tables, 3);
    assert_eq!(config.database.max_rows, 50);
    assert!(config.memory.use_summary);
    assert!(!config.session.show_reasoning);

    let home = dirs::home_dir().unwrap();
    assert_eq!(config.database.path, home.join(".dbchat").join("data.db"));
}

#[test]
fn test_postgres_url_loaded_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().display().to_string();
    let toml = full_config(&data_dir).replace(
        "[database]\n",
        "[database]\nurl = \"postgres://dbchat@localhost:5432/shop\"\n",
    );

    let config = Config::from_toml_str(&toml).unwrap();
    assert_eq!(
        config.database.url.as_deref(),
        Some("postgres://dbchat@localhost:5432/shop")
    );
    assert_eq!(config.database.location(), "postgres://dbchat@localhost:5432/shop");

    let round_trip = Config::from_toml_str(&toml::to_string(&config).unwrap()).unwrap();
    assert_eq!(round_trip.database.url, config.database.url);
}

#[test]
fn test_invalid_values_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().display().to_string();

    let bad_provider = full_config(&data_dir).replace("\"openai\"", "\"anthropic\"");
    assert!(Config::from_toml_str(&bad_provider).is_err());

    let bad_level = full_config(&data_dir).replace("\"debug\"", "\"loud\"");
    assert!(Config::from_toml_str(&bad_level).is_err());

    let bad_temperature = full_config(&data_dir).replace("temperature = 0.3", "temperature = 2.5");
    assert!(Config::from_toml_str(&bad_temperature).is_err());

    let bad_rows = full_config(&data_dir).replace("max_rows = 100", "max_rows = 0");
    assert!(Config::from_toml_str(&bad_rows).is_err());

    let bad_url = full_config(&data_dir).replace("[database]\n", "[database]\nurl = \"mysql://root@localhost/shop\"\n");
    assert!(Config::from_toml_str(&bad_url).is_err());
}

#[test]
fn test_malformed_toml_is_a_config_error() {
    let err = Config::from_toml_str("[core\nlog_level = ").unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}

#[test]
fn test_missing_file_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = Config::load_from_path(&temp_dir.path().join("absent.toml"));
    assert!(result.is_err());
}
