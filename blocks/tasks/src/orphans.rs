use chrono::{Duration, Utc};
use manage_task_atoms::media::url_key_segment;
use std::collections::HashSet;

use crate::error::WorkflowError;
use crate::workflow::TaskWorkflow;

/// Objects younger than this many minutes are never swept. Create and update
/// upload before the record is written, so a fresh object may still be about
/// to be referenced.
pub const ORPHAN_MIN_AGE_MINUTES: i64 = 60;

impl TaskWorkflow {
    /// Keys of stored images that no task's `image_url` points at.
    ///
    /// Matching is on the key (the URL's last path segment), so URLs written
    /// under an earlier public base still count. Objects newer than
    /// [`ORPHAN_MIN_AGE_MINUTES`] or of unknown age are left out.
    pub async fn find_orphaned_images(&self) -> Result<Vec<String>, WorkflowError> {
        let referenced: HashSet<String> = self
            .task_store()
            .list()
            .await?
            .into_iter()
            .filter_map(|record| record.image_url)
            .filter_map(|url| url_key_segment(&url))
            .collect();

        let cutoff = Utc::now() - Duration::minutes(ORPHAN_MIN_AGE_MINUTES);
        let mut orphans = Vec::new();
        for image in self.image_store().list_images().await? {
            match image.last_modified {
                Some(modified) if modified <= cutoff => {}
                _ => {
                    tracing::debug!(key = %image.key, "image too recent to sweep");
                    continue;
                }
            }

            let url = self.image_store().public_url(&image.key)?;
            match url_key_segment(&url) {
                Some(segment) if !referenced.contains(&segment) => orphans.push(image.key),
                Some(_) => {}
                None => tracing::warn!(key = %image.key, url = %url, "cannot derive key segment, keeping image"),
            }
        }

        Ok(orphans)
    }

    /// Delete every orphaned image and return the deleted keys. Stops at the
    /// first failed delete.
    pub async fn collect_orphaned_images(&self) -> Result<Vec<String>, WorkflowError> {
        let orphans = self.find_orphaned_images().await?;

        for key in &orphans {
            self.image_store().delete(key).await?;
            tracing::info!(key = %key, "orphaned image deleted");
        }

        Ok(orphans)
    }
}

#[cfg(test)]
mod tests {
    use super::ORPHAN_MIN_AGE_MINUTES;
    use crate::workflow::{CreateTaskInput, TaskWorkflow, UpdateTaskInput};
    use chrono::Duration;
    use manage_task_atoms::media::{ImageStore, ImageUpload, MemoryImageStore};
    use manage_task_atoms::tasks::{MemoryTaskStore, TaskRecord};
    use std::sync::Arc;

    fn with_image(title: &str, file_name: &str) -> CreateTaskInput {
        CreateTaskInput {
            title: title.to_string(),
            image: Some(ImageUpload::new(file_name, vec![1, 2, 3])),
            ..Default::default()
        }
    }

    fn past_min_age() -> Duration {
        Duration::minutes(ORPHAN_MIN_AGE_MINUTES + 1)
    }

    #[tokio::test]
    async fn replaced_and_deleted_images_are_orphans() {
        let tasks = Arc::new(MemoryTaskStore::new());
        let images = Arc::new(MemoryImageStore::local());
        let workflow = TaskWorkflow::new(tasks.clone(), images.clone());

        let kept = workflow.create_task(with_image("Kept", "kept.png")).await.unwrap();
        let replaced = workflow.create_task(with_image("Replaced", "old.png")).await.unwrap();
        let deleted = workflow.create_task(with_image("Deleted", "gone.png")).await.unwrap();

        workflow
            .update_task(
                &replaced,
                UpdateTaskInput {
                    title: "Replaced".to_string(),
                    image: Some(ImageUpload::new("new.png", vec![4])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        workflow.delete_task(&deleted).await.unwrap();
        images.backdate(past_min_age()).await;

        let mut orphans = workflow.find_orphaned_images().await.unwrap();
        orphans.sort();
        assert_eq!(orphans.len(), 2);
        assert!(orphans.iter().any(|k| k.ends_with("-old.png")));
        assert!(orphans.iter().any(|k| k.ends_with("-gone.png")));
        // Dry run deletes nothing
        assert_eq!(images.keys().await.len(), 4);

        let collected = workflow.collect_orphaned_images().await.unwrap();
        assert_eq!(collected.len(), 2);

        let remaining = images.keys().await;
        assert_eq!(remaining.len(), 2);
        let kept_url = workflow.get_task(&kept).await.unwrap().image_url;
        assert!(remaining
            .iter()
            .any(|k| images.public_url(k).unwrap() == kept_url));
    }

    #[tokio::test]
    async fn nothing_to_collect_when_every_image_is_referenced() {
        let images = Arc::new(MemoryImageStore::local());
        let workflow = TaskWorkflow::new(Arc::new(MemoryTaskStore::new()), images.clone());
        workflow.create_task(with_image("Only", "only.png")).await.unwrap();
        images.backdate(past_min_age()).await;

        assert!(workflow.collect_orphaned_images().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn urls_written_under_another_base_still_reference_their_image() {
        let tasks = Arc::new(MemoryTaskStore::new());
        let images = Arc::new(MemoryImageStore::local());
        let workflow = TaskWorkflow::new(tasks.clone(), images.clone());

        images.upload("abc-cat.png", vec![1], "image/png").await.unwrap();
        images.upload("def-my dog.png", vec![2], "image/png").await.unwrap();
        tasks
            .insert_raw(TaskRecord {
                task_id: "t1".to_string(),
                title: Some("Cat".to_string()),
                image_url: Some(
                    "https://manage-task-images.s3.ap-southeast-2.amazonaws.com/abc-cat.png"
                        .to_string(),
                ),
                ..Default::default()
            })
            .await;
        tasks
            .insert_raw(TaskRecord {
                task_id: "t2".to_string(),
                title: Some("Dog".to_string()),
                image_url: Some("https://cdn.example.com/img/def-my%20dog.png".to_string()),
                ..Default::default()
            })
            .await;
        images.backdate(past_min_age()).await;

        let collected = workflow.collect_orphaned_images().await.unwrap();

        assert!(collected.is_empty());
        assert_eq!(images.keys().await, vec!["abc-cat.png", "def-my dog.png"]);
        assert_eq!(images.delete_calls(), 0);
    }

    #[tokio::test]
    async fn fresh_uploads_are_never_collected() {
        let images = Arc::new(MemoryImageStore::local());
        let workflow = TaskWorkflow::new(Arc::new(MemoryTaskStore::new()), images.clone());

        // Uploaded, record write not landed yet
        images.upload("abc-pending.png", vec![1], "image/png").await.unwrap();

        assert!(workflow.find_orphaned_images().await.unwrap().is_empty());
        assert!(workflow.collect_orphaned_images().await.unwrap().is_empty());
        assert_eq!(images.keys().await, vec!["abc-pending.png"]);

        images.backdate(past_min_age()).await;
        assert_eq!(
            workflow.collect_orphaned_images().await.unwrap(),
            vec!["abc-pending.png"]
        );
        assert!(images.keys().await.is_empty());
    }
}
