//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for interacting with the supported LLM
//! providers (Ollama, OpenAI). The LLMProvider trait defines the contract that all
//! providers must implement, enabling the LLM router to fail over between them
//! transparently. The router is what the conversation core sees, through the
//! sdk `LanguageModel` capability.

use async_trait::async_trait;
use sdk::capabilities::CapabilityError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod ollama;
pub mod openai;
pub mod router;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for CapabilityError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::ProviderUnavailable(msg) | LLMError::NetworkError(msg) => {
                CapabilityError::Unavailable(msg)
            }
            LLMError::AuthenticationFailed(msg) => CapabilityError::Authentication(msg),
            LLMError::RateLimitExceeded => CapabilityError::RateLimited,
            LLMError::Timeout => CapabilityError::Timeout,
            LLMError::InvalidRequest(msg) | LLMError::ParseError(msg) => {
                CapabilityError::InvalidResponse(msg)
            }
        }
    }
}

/// Message in a conversation sent to a provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama), false for cloud providers
    fn is_local(&self) -> bool;

    /// Returns the estimated cost in USD for the given number of tokens
    /// Local providers should return 0.0
    fn estimated_cost(&self, tokens: usize) -> f64;

    /// Generate a completion from the LLM
    ///
    /// # Arguments
    /// * `messages` - Conversation to send, usually a single user prompt
    ///
    /// # Returns
    /// * `Ok(String)` - The assistant's text, unmodified
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        let assistant_msg = Message::assistant("Hi there");
        assert_eq!(assistant_msg.role, MessageRole::Assistant);
        assert_eq!(assistant_msg.content, "Hi there");

        let system_msg = Message::system("You are a helpful assistant");
        assert_eq!(system_msg.role, MessageRole::System);
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("test");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"user""#));
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, deserialized);
    }

    #[test]
    fn test_error_conversion_to_capability_error() {
        assert_eq!(
            CapabilityError::from(LLMError::Timeout),
            CapabilityError::Timeout
        );
        assert_eq!(
            CapabilityError::from(LLMError::RateLimitExceeded),
            CapabilityError::RateLimited
        );
        assert_eq!(
            CapabilityError::from(LLMError::AuthenticationFailed("401".into())),
            CapabilityError::Authentication("401".into())
        );
        assert_eq!(
            CapabilityError::from(LLMError::NetworkError("reset".into())),
            CapabilityError::Unavailable("reset".into())
        );
        assert_eq!(
            CapabilityError::from(LLMError::ParseError("bad json".into())),
            CapabilityError::InvalidResponse("bad json".into())
        );
    }
}
