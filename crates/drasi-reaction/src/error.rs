//! Error types for the reaction SDK
//!
//! This module contains the error types used throughout the SDK.

use thiserror::Error;

/// Reaction error types
#[derive(Error, Debug)]
pub enum ReactionError {
    /// Query configuration file unreadable or unparsable; fatal at startup
    #[error("Query configuration error: {0}")]
    QueryConfig(String),

    /// Inbound payload failed schema validation for its declared kind
    #[error("Invalid {kind} event: {message}")]
    InvalidEvent {
        /// Declared event kind ("change" or "control")
        kind: &'static str,
        /// Underlying validation failure
        message: String,
    },

    /// Request body was not parseable as JSON
    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),

    /// A user-supplied event callback failed
    #[error("Callback error: {0}")]
    Callback(String),

    /// Reaction configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Outbound HTTP request error
    #[error("HTTP request error: {0}")]
    Http(String),
}

/// Result type for reaction operations
pub type ReactionResult<T> = Result<T, ReactionError>;

// Implement conversions from other error types
impl From<std::io::Error> for ReactionError {
    fn from(err: std::io::Error) -> Self {
        ReactionError::Io(format!("{}", err))
    }
}

impl From<reqwest::Error> for ReactionError {
    fn from(err: reqwest::Error) -> Self {
        ReactionError::Http(format!("{}", err))
    }
}

impl From<anyhow::Error> for ReactionError {
    fn from(err: anyhow::Error) -> Self {
        ReactionError::Callback(format!("{:#}", err))
    }
}

impl ReactionError {
    /// Check if the error aborts startup rather than failing a single call
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReactionError::QueryConfig(_) | ReactionError::Config(_) | ReactionError::Io(_)
        )
    }

    /// Check if the error is scoped to one inbound delivery
    pub fn is_per_call(&self) -> bool {
        matches!(
            self,
            ReactionError::InvalidEvent { .. }
                | ReactionError::MalformedPayload(_)
                | ReactionError::Callback(_)
        )
    }
}
