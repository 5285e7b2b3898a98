use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::model::{NewTask, TaskPatch, TaskRecord};
use super::service::TaskStore;
use crate::error::RecordError;

/// How many times each store operation was invoked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStoreCalls {
    pub create: usize,
    pub list: usize,
    pub get: usize,
    pub update: usize,
    pub delete: usize,
}

impl TaskStoreCalls {
    pub fn total(&self) -> usize {
        self.create + self.list + self.get + self.update + self.delete
    }
}

/// In-process record store. Keeps insertion order, counts calls and can be
/// told to fail, which is all the workflow tests need.
#[derive(Default)]
pub struct MemoryTaskStore {
    records: RwLock<Vec<TaskRecord>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    create_calls: AtomicUsize,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw record as-is, bypassing the call counters.
    pub async fn insert_raw(&self, record: TaskRecord) {
        self.records.write().await.push(record);
    }

    pub async fn records(&self) -> Vec<TaskRecord> {
        self.records.read().await.clone()
    }

    /// Make create/update/delete fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make list/get fail with a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> TaskStoreCalls {
        TaskStoreCalls {
            create: self.create_calls.load(Ordering::SeqCst),
            list: self.list_calls.load(Ordering::SeqCst),
            get: self.get_calls.load(Ordering::SeqCst),
            update: self.update_calls.load(Ordering::SeqCst),
            delete: self.delete_calls.load(Ordering::SeqCst),
        }
    }

    fn check(&self, flag: &AtomicBool, operation: &'static str) -> Result<(), RecordError> {
        if flag.load(Ordering::SeqCst) {
            return Err(RecordError::backend(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: NewTask) -> Result<String, RecordError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_writes, "memory create")?;

        let task_id = uuid::Uuid::new_v4().to_string();
        self.records.write().await.push(TaskRecord {
            task_id: task_id.clone(),
            title: Some(task.title),
            detail: Some(task.detail),
            is_complete: Some(task.is_complete),
            image_url: Some(task.image_url),
            created_at: Some(task.created_at),
            updated_at: Some(task.updated_at),
        });

        Ok(task_id)
    }

    async fn list(&self) -> Result<Vec<TaskRecord>, RecordError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_reads, "memory list")?;

        Ok(self.records.read().await.clone())
    }

    async fn get(&self, task_id: &str) -> Result<TaskRecord, RecordError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_reads, "memory get")?;

        self.records
            .read()
            .await
            .iter()
            .find(|r| r.task_id == task_id)
            .cloned()
            .ok_or_else(|| RecordError::NotFound(task_id.to_string()))
    }

    async fn update(&self, task_id: &str, patch: TaskPatch) -> Result<(), RecordError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_writes, "memory update")?;

        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.task_id == task_id)
            .ok_or_else(|| RecordError::NotFound(task_id.to_string()))?;

        if let Some(title) = patch.title {
            record.title = Some(title);
        }
        if let Some(detail) = patch.detail {
            record.detail = Some(detail);
        }
        if let Some(is_complete) = patch.is_complete {
            record.is_complete = Some(is_complete);
        }
        if let Some(image_url) = patch.image_url {
            record.image_url = Some(image_url);
        }
        if let Some(updated_at) = patch.updated_at {
            record.updated_at = Some(updated_at);
        }

        Ok(())
    }

    async fn delete(&self, task_id: &str) -> Result<(), RecordError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_writes, "memory delete")?;

        self.records.write().await.retain(|r| r.task_id != task_id);
        Ok(())
    }
}
