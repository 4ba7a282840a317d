//! Error types for sqlpilot.
//!
//! Defines the main error enum used throughout the pipeline. Policy rejections
//! are not errors: they surface as a normal response carrying the reasons.

use thiserror::Error;

/// Main error type for sqlpilot operations.
#[derive(Error, Debug)]
pub enum PilotError {
    /// Missing or malformed configuration (connection descriptors, config file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested dialect matches no known execution adapter.
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// The backend raised while counting or executing a query.
    #[error("Execution error: {0}")]
    Execution(String),

    /// LLM API errors (auth, timeouts, malformed responses).
    #[error("LLM error: {0}")]
    Llm(String),

    /// Context retrieval errors.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PilotError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an unsupported-dialect error for the given dialect name.
    pub fn unsupported_dialect(name: impl Into<String>) -> Self {
        Self::UnsupportedDialect(name.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a retrieval error with the given message.
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::UnsupportedDialect(_) => "Unsupported Dialect",
            Self::Execution(_) => "Execution Error",
            Self::Llm(_) => "LLM Error",
            Self::Retrieval(_) => "Retrieval Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using PilotError.
pub type Result<T> = std::result::Result<T, PilotError>;
