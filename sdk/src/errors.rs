//! Error types and handling
//!
//! This module provides the error types used throughout the DbChat engine.
//! All errors implement the `ErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages are meant to be shown in a terminal. Anything that may carry
//! a provider response or a connection string is scrubbed by the engine before
//! it is displayed.

use thiserror::Error;

/// Trait for DbChat error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain:
    /// - Secrets (API keys, tokens, passwords)
    /// - Internal implementation details
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors require the user to fix their setup first.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Database**: Connection and query failures, refused writes
/// - **Keyring**: OS keychain access
///
/// Language model failures have their own type, `CapabilityError`, since the
/// conversation core only sees models through the capability traits.
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::WriteQueryNotAllowed;
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("unknown provider".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Write query not allowed")]
    WriteQueryNotAllowed,

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Database(_) => {
                "Database operation failed. Check the database settings in config.toml"
            }
            Self::WriteQueryNotAllowed => "Only read queries are permitted",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
