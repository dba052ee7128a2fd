//! Error types for the medrec CLI
//!
//! User-facing errors with clear, actionable messages.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or .env file.")]
    Config(String),

    /// Record store (database) operation failed
    #[error("Record store error: {0}. Check DATABASE_URL and that the configured table and columns exist.")]
    Records(#[from] medrec_core::RecordStoreError),

    /// The reconciliation batch itself failed to run
    #[error("Reconciliation failed: {0}")]
    Engine(#[from] medrec_core::ReconcileError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check MEDREC_MEDIA_ROOT and file permissions.")]
    Io(#[from] std::io::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
