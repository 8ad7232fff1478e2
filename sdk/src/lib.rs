//! DbChat SDK
//!
//! Shared contracts between the DbChat engine and the services it drives.
//! The conversation core only ever talks to language models, database agents
//! and summarizers through the capability traits defined here.

/// Capability traits for external services
pub mod capabilities;

/// Error types and handling
pub mod errors;

/// Conversation types
pub mod types;

// Re-export commonly used types
pub use capabilities::{
    CapabilityError, DatabaseAgent, DatabaseAgentError, LanguageModel, Summarizer,
};
pub use errors::{EngineError, ErrorExt};
pub use types::{Role, Turn};
