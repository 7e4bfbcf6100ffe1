//! Error types for the reconciliation executor
//!
//! This module defines all error types used throughout the crate.
//!
//! Remote API errors carry opaque message strings only: the wrapped client
//! libraries expose no structured error taxonomy, so transient-failure
//! detection happens by message content in [`crate::retry::RetryClassifier`].

use std::time::Duration;
use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation executor
#[derive(Error, Debug)]
pub enum Error {
    /// Remote API call failure; the message is the remote's own error text
    #[error("API error: {0}")]
    Api(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (identifier format, validation failures)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested object does not exist remotely
    #[error("Not found: {0}")]
    NotFound(String),

    /// Creation refused because matching entries already exist
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Write call attempted while the client is in read-only mode
    #[error("Write calls are disabled: {0}")]
    ReadOnly(String),

    /// Retry deadline elapsed with only transient failures observed
    ///
    /// Carries the last transient error so operators can distinguish
    /// "the remote kept rejecting us" from "the remote told us no".
    #[error("timed out after {elapsed:?}, last transient error: {source}")]
    Timeout {
        /// Total time spent retrying
        elapsed: Duration,
        /// The last transient error observed before giving up
        source: Box<Error>,
    },

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a remote API error from the remote's message text
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an "already exists" error
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a read-only mode error
    pub fn read_only(msg: impl Into<String>) -> Self {
        Self::ReadOnly(msg.into())
    }

    /// Create a timeout error wrapping the last transient failure
    pub fn timeout(elapsed: Duration, last: Error) -> Self {
        Self::Timeout {
            elapsed,
            source: Box::new(last),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
