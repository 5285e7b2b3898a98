//! Domain atoms for the task manager.
//!
//! `tasks` owns the task record and the record store; `media` owns image
//! objects and the object store. Neither knows about the other, the
//! workflow block composes them.

pub mod error;
pub mod media;
pub mod tasks;

pub use error::{RecordError, StorageError};
