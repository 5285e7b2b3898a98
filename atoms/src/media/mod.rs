// Re-export model types and store implementations
pub mod memory;
pub mod model;
pub mod service;

pub use memory::{MemoryImageStore, StoredObject};
pub use model::{
    content_type_for, is_public_url, parse_public_base, public_url_for, storage_key,
    url_key_segment, ImageUpload, StoredImage,
};
pub use service::*;
