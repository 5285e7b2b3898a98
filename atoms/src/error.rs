use thiserror::Error;

/// Failures reported by a [`crate::tasks::TaskStore`].
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("{operation} error: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl RecordError {
    pub fn backend(operation: &'static str, err: impl std::fmt::Display) -> Self {
        RecordError::Backend {
            operation,
            message: err.to_string(),
        }
    }
}

/// Failures reported by a [`crate::media::ImageStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// An object already lives under this key; uploads never overwrite.
    #[error("Object already exists: {0}")]
    Conflict(String),

    #[error("{operation} error: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid public URL base: {0}")]
    InvalidUrl(String),
}

impl StorageError {
    pub fn backend(operation: &'static str, err: impl std::fmt::Display) -> Self {
        StorageError::Backend {
            operation,
            message: err.to_string(),
        }
    }
}
