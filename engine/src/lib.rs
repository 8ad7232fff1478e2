//! DbChat Engine Library
//!
//! This library provides the core functionality of the DbChat engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Database access module
pub mod db;

/// LLM provider abstraction layer
pub mod llm;

/// Capability implementations (SQL agent, summarizer)
pub mod agent;

/// Conversation core
pub mod conductor;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
