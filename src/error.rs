//! Error types for dsdiff operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiffError>;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "duckdb")]
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Cannot access dataset '{handle}': {message}")]
    Access { handle: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl DiffError {
    pub fn access(handle: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Access {
            handle: handle.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// Whether the error came from the data provider rather than the job setup
    pub fn is_access(&self) -> bool {
        matches!(self, Self::Access { .. } | Self::Io(_))
    }
}
