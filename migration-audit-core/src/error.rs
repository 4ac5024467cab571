//! Error types for migration-audit-core

use thiserror::Error;

/// Main error type for the migration-audit-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or payload error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The request never produced an HTTP response (DNS, TLS, timeout, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// GitHub answered with a non-success status
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl Error {
    /// Whether retrying the same request may succeed.
    ///
    /// Rate-limit responses are handled separately by the client, which
    /// knows the reset headers.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type alias for migration-audit-core
pub type Result<T> = std::result::Result<T, Error>;
