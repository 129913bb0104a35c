//! Error types for eventbeacon-core

use thiserror::Error;

/// Main error type for the eventbeacon-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error (log directory setup)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The collection endpoint is not a usable URL
    #[error("invalid endpoint {endpoint:?}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    /// Network or server failure while submitting an event
    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Whether a failed send should be parked in the retry queue.
    ///
    /// Only network or server failures are retried; everything else is
    /// dropped.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Result type alias for eventbeacon-core
pub type Result<T> = std::result::Result<T, Error>;
