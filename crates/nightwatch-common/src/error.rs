//! Error types for Nightwatch.

use thiserror::Error;

/// Top-level error type for Nightwatch operations.
#[derive(Debug, Error)]
pub enum NightwatchError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Nightwatch operations.
pub type NightwatchResult<T> = Result<T, NightwatchError>;
