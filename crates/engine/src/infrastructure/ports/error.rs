//! Error types for port boundaries.

use thiserror::Error;

/// Persistence failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend operation failed - includes operation name for tracing.
    #[error("Storage error in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    /// A stored value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Create a Backend error with operation context.
    pub fn backend(operation: &'static str, message: impl ToString) -> Self {
        Self::Backend {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e)
    }
}

#[derive(Debug, Error)]
pub enum StepSourceError {
    #[error("Step data unavailable for {date}: {message}")]
    Unavailable {
        date: chrono::NaiveDate,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum ProgressionError {
    #[error("Progression tracker rejected contribution: {0}")]
    Rejected(String),

    #[error("Progression tracker unavailable: {0}")]
    Unavailable(String),
}
