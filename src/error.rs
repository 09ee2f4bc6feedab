//! Error types for the dispatcher.
//!
//! Only recoverable conditions live here. Misuse of the dispatcher (double
//! unsubscribe, reentrant dispatch, delivery off the main context) panics.

use thiserror::Error;

/// Main error type for dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Handler failed: {0}")]
    Handler(String),

    #[error("Middleware failed: {0}")]
    Middleware(String),

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Main context is no longer running")]
    MainContextClosed,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DispatchError {
    /// Shorthand for a subscriber failure.
    pub fn handler(msg: impl Into<String>) -> Self {
        DispatchError::Handler(msg.into())
    }

    /// Shorthand for a middleware failure.
    pub fn middleware(msg: impl Into<String>) -> Self {
        DispatchError::Middleware(msg.into())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        DispatchError::InvalidConfig(e.to_string())
    }
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
