use manage_task_atoms::media::{is_public_url, storage_key, ImageStore, ImageUpload};
use manage_task_atoms::tasks::{is_valid_title, normalize, NewTask, Task, TaskPatch, TaskStore};
use std::sync::Arc;

use crate::error::WorkflowError;

#[derive(Debug, Clone, Default)]
pub struct CreateTaskInput {
    pub title: String,
    pub detail: String,
    pub is_complete: bool,
    pub image: Option<ImageUpload>,
}

/// Full replacement of a task's editable fields.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskInput {
    pub title: String,
    pub detail: String,
    pub is_complete: bool,
    /// New image to upload; replaces the current one.
    pub image: Option<ImageUpload>,
    /// The `image_url` the caller loaded with the task. `None` keeps the
    /// stored value.
    pub current_image_url: Option<String>,
    /// Detach the current image (the stored object is kept).
    pub remove_image: bool,
}

/// Keeps a task record and its optional image consistent across create,
/// read, update and delete.
///
/// Images are uploaded before the record is written. A failed upload aborts
/// the operation with nothing written; a failed record write after a
/// successful upload leaves the object orphaned. Superseded and deleted
/// tasks' images are never removed here, see
/// [`TaskWorkflow::collect_orphaned_images`].
#[derive(Clone)]
pub struct TaskWorkflow {
    tasks: Arc<dyn TaskStore>,
    images: Arc<dyn ImageStore>,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn validate_title(title: &str) -> Result<(), WorkflowError> {
    if is_valid_title(title) {
        Ok(())
    } else {
        Err(WorkflowError::Validation("Task title is required".to_string()))
    }
}

impl TaskWorkflow {
    pub fn new(tasks: Arc<dyn TaskStore>, images: Arc<dyn ImageStore>) -> Self {
        Self { tasks, images }
    }

    pub(crate) fn task_store(&self) -> &dyn TaskStore {
        self.tasks.as_ref()
    }

    pub(crate) fn image_store(&self) -> &dyn ImageStore {
        self.images.as_ref()
    }

    /// Upload under a fresh key and return the object's public URL.
    async fn upload_image(&self, image: ImageUpload) -> Result<String, WorkflowError> {
        let key = storage_key(&image.file_name);
        let content_type = image.content_type();

        self.images.upload(&key, image.bytes, &content_type).await?;
        let url = self.images.public_url(&key)?;

        tracing::info!(key = %key, content_type = %content_type, "image uploaded");
        Ok(url)
    }

    /// Create a task, uploading its image first. Returns the new task id.
    pub async fn create_task(&self, input: CreateTaskInput) -> Result<String, WorkflowError> {
        validate_title(&input.title)?;

        let image_url = match input.image {
            Some(image) => self.upload_image(image).await?,
            None => String::new(),
        };

        let now = now();
        let result = self
            .tasks
            .create(NewTask {
                title: input.title,
                detail: input.detail,
                is_complete: input.is_complete,
                image_url: image_url.clone(),
                created_at: now.clone(),
                updated_at: now,
            })
            .await;

        match result {
            Ok(task_id) => {
                tracing::info!(task_id = %task_id, "task created");
                Ok(task_id)
            }
            Err(e) => {
                if !image_url.is_empty() {
                    tracing::warn!(image_url = %image_url, "task write failed after upload, image left orphaned");
                }
                Err(e.into())
            }
        }
    }

    /// Every task, in store order, with missing fields defaulted.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, WorkflowError> {
        let records = self.tasks.list().await?;
        let now = now();

        Ok(records
            .into_iter()
            .map(|record| normalize(record, &now))
            .collect())
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, WorkflowError> {
        let record = self.tasks.get(task_id).await?;
        Ok(normalize(record, &now()))
    }

    /// Replace a task's fields. A new image is uploaded before anything is
    /// written; without one the current `image_url` is kept (or cleared when
    /// `remove_image` is set).
    pub async fn update_task(&self, task_id: &str, input: UpdateTaskInput) -> Result<(), WorkflowError> {
        validate_title(&input.title)?;

        let stored = self.tasks.get(task_id).await?;
        let stored_url = stored.image_url.unwrap_or_default();

        let mut image_url = match input.current_image_url {
            Some(url) if url.is_empty() || is_public_url(&url) => url,
            Some(url) => {
                tracing::warn!(task_id = %task_id, image_url = %url, "ignoring non-public image url, keeping the stored one");
                stored_url
            }
            None => stored_url,
        };

        if let Some(image) = input.image {
            image_url = self.upload_image(image).await?;
        } else if input.remove_image {
            image_url = String::new();
        }

        self.tasks
            .update(
                task_id,
                TaskPatch {
                    title: Some(input.title),
                    detail: Some(input.detail),
                    is_complete: Some(input.is_complete),
                    image_url: Some(image_url),
                    updated_at: Some(now()),
                },
            )
            .await?;

        tracing::info!(task_id = %task_id, "task updated");
        Ok(())
    }

    /// Delete the record. Deleting a missing task succeeds; the image
    /// object stays in the bucket.
    pub async fn delete_task(&self, task_id: &str) -> Result<(), WorkflowError> {
        self.tasks.delete(task_id).await?;

        tracing::info!(task_id = %task_id, "task deleted");
        Ok(())
    }
}
