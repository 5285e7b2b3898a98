use manage_task_atoms::{RecordError, StorageError};
use thiserror::Error;

/// Everything a workflow operation can fail with.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Rejected before any I/O.
    #[error("{0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    /// Image upload or URL resolution failed; no record was written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Record(RecordError),
}

impl From<RecordError> for WorkflowError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound(task_id) => WorkflowError::NotFound(task_id),
            other => WorkflowError::Record(other),
        }
    }
}
