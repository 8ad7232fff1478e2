//! Capability traits
//!
//! The conversation core treats language models, the database agent and the
//! summarizer as opaque services. Each one is a small async trait so the
//! engine can plug in real providers and tests can plug in mocks.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Turn;

/// Errors raised by a language model or summarizer call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Timeout")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by the database agent
///
/// `OutputParse` is kept apart from the other failures: the agent produced
/// something, it just could not be turned into a structured step. The raw
/// output is still worth showing to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DatabaseAgentError {
    #[error("Could not parse agent output")]
    OutputParse { raw: String },

    #[error("Query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// A text-in, text-out language model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send a single prompt and return the model's raw text output
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError>;
}

/// Answers natural-language questions from live database data
#[async_trait]
pub trait DatabaseAgent: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String, DatabaseAgentError>;
}

/// Condenses a conversation into a running summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, turns: &[Turn]) -> Result<String, CapabilityError>;
}
