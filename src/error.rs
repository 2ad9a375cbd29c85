//! Error types for patpack.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum PatpackError {
    /// Invalid configuration (weights, env overrides, config files).
    #[error("configuration error: {0}")]
    Config(String),

    /// A pattern record failed validation at the storage boundary.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PatpackError>;
