//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid lifecycle status: {0}")]
    InvalidStatus(String),

    #[error("Invalid build token: {0}")]
    InvalidToken(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
