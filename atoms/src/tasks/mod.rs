// Re-export model types and store implementations
pub mod memory;
pub mod model;
pub mod service;

pub use memory::{MemoryTaskStore, TaskStoreCalls};
pub use model::{is_valid_title, normalize, NewTask, Task, TaskPatch, TaskRecord};
pub use service::*;
