//! Error types shared across the medrec workspace

use thiserror::Error;

/// Result type alias for medrec operations
pub type Result<T> = std::result::Result<T, MedrecError>;

/// Main error type for shared utilities
#[derive(Error, Debug)]
pub enum MedrecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid media root: {0}")]
    InvalidMediaRoot(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
