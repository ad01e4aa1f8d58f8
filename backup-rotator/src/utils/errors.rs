//! Custom error types for the retention engine.
//!
//! Per-source failures (validation, creation, verification) are carried on
//! the source's outcome and never abort the rest of a run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RotatorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid source name: {0}")]
    InvalidSourceName(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Archive creation failed: {0}")]
    Creation(String),

    #[error("Archive verification failed: {0}")]
    Verification(String),

    #[error("Run cancelled")]
    Cancelled,
}

impl RotatorError {
    /// Short machine-readable tag, used in the JSON run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            RotatorError::Config(_) => "config",
            RotatorError::Io(_) => "io",
            RotatorError::InvalidSourceName(_) => "invalid_source_name",
            RotatorError::Validation(_) => "validation",
            RotatorError::Creation(_) => "creation",
            RotatorError::Verification(_) => "verification",
            RotatorError::Cancelled => "cancelled",
        }
    }
}

pub type Result<T> = std::result::Result<T, RotatorError>;
