use serde::{Deserialize, Serialize};

/// Task domain model - a unit of work with an optional image
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Task {
    /// Assigned by the record store; FE / API call it "id"
    #[serde(rename = "id")]
    pub task_id: String,
    pub title: String,
    pub detail: String,
    pub is_complete: bool,

    // FE expects a plain string (empty string = no image)
    pub image_url: String,

    pub created_at: String,
    pub updated_at: String,
}

/// A task as it sits in the record store. Older clients wrote partial
/// records, so everything but the id may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskRecord {
    pub task_id: String,
    pub title: Option<String>,
    pub detail: Option<String>,
    pub is_complete: Option<bool>,
    pub image_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Full record written on create. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub detail: String,
    pub is_complete: bool,
    pub image_url: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Merge update: `None` fields are left untouched in the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub is_complete: Option<bool>,
    pub image_url: Option<String>,
    pub updated_at: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.detail.is_none()
            && self.is_complete.is_none()
            && self.image_url.is_none()
            && self.updated_at.is_none()
    }
}

/// Coerce a raw record into a [`Task`], filling every missing field with its
/// default. Missing timestamps become `now`.
pub fn normalize(record: TaskRecord, now: &str) -> Task {
    Task {
        task_id: record.task_id,
        title: record.title.unwrap_or_default(),
        detail: record.detail.unwrap_or_default(),
        is_complete: record.is_complete.unwrap_or(false),
        image_url: record.image_url.unwrap_or_default(),
        created_at: record.created_at.unwrap_or_else(|| now.to_string()),
        updated_at: record.updated_at.unwrap_or_else(|| now.to_string()),
    }
}

/// A title is usable once it has something besides whitespace.
pub fn is_valid_title(title: &str) -> bool {
    !title.trim().is_empty()
}
