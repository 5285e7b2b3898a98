//! Task persistence workflow: composes the `tasks` and `media` atoms so a
//! task record and its optional image stay consistent, plus the HTTP
//! handlers that expose it.

pub mod error;
pub mod orphans;
pub mod tasks;
pub mod types;
pub mod workflow;

pub use error::WorkflowError;
pub use workflow::{CreateTaskInput, TaskWorkflow, UpdateTaskInput};
