//! Error types for pricebook-core

use thiserror::Error;

/// Result type alias using pricebook-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pricebook-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Network/transport error while talking to the remote source
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote document could not be decoded at all
    #[error("Document decode error: {0}")]
    Decode(String),

    /// Remote document yielded zero usable records
    #[error("Document contained no usable records")]
    EmptyDocument,

    /// Product not found
    #[error("Product not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the scheduler should retry the operation.
    ///
    /// Transport failures (no network, timeout, non-2xx) are recoverable;
    /// everything else is terminal until the next scheduled run.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient() {
        assert!(Error::Transport("connection refused".into()).is_transient());
        assert!(!Error::EmptyDocument.is_transient());
        assert!(!Error::Decode("bad json".into()).is_transient());
    }
}
