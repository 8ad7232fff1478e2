//! Capability implementations
//!
//! Concrete services behind the sdk traits: a SQL agent over the configured
//! SQLite database and a summarizer backed by the language model.

pub mod sql_agent;
pub mod summarizer;

pub use sql_agent::{extract_sql, SqlAgent};
pub use summarizer::LlmSummarizer;
