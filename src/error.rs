//! Error types for parley.

use std::io;
use thiserror::Error;

/// Result type alias for parley operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in parley operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Sessions root unreadable or unwritable, or a session file failed to load.
    #[error("Storage error: {0}")]
    Storage(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Requested session is not in the current collection.
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    /// Internal consistency failure. Not user-recoverable.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Language model or agent call failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the UI is expected to handle this error and carry on.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidSessionId(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Collaborator(e.to_string())
    }
}
