use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use url::Url;

use super::model::{parse_public_base, public_url_for, StoredImage};
use super::service::ImageStore;
use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// In-process object store with the same no-overwrite rule as S3
/// conditional puts.
pub struct MemoryImageStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    public_base: Url,
    fail_uploads: AtomicBool,
    upload_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryImageStore {
    pub fn new(public_base: Url) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            public_base,
            fail_uploads: AtomicBool::new(false),
            upload_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Store served from `http://localhost/images/`, for tests and local runs.
    pub fn local() -> Self {
        let base = parse_public_base("http://localhost/images/")
            .expect("static base url is valid");
        Self::new(base)
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Push every stored object's upload time `by` into the past.
    pub async fn backdate(&self, by: Duration) {
        for object in self.objects.write().await.values_mut() {
            object.uploaded_at -= by;
        }
    }

    /// Make every upload fail with a backend error.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::backend("memory upload", "injected failure"));
        }

        let mut objects = self.objects.write().await;
        if objects.contains_key(key) {
            return Err(StorageError::Conflict(key.to_string()));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                uploaded_at: Utc::now(),
            },
        );

        Ok(())
    }

    fn public_url(&self, key: &str) -> Result<String, StorageError> {
        public_url_for(&self.public_base, key)
    }

    async fn list_images(&self) -> Result<Vec<StoredImage>, StorageError> {
        Ok(self
            .objects
            .read()
            .await
            .iter()
            .map(|(key, object)| StoredImage {
                key: key.clone(),
                last_modified: Some(object.uploaded_at),
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.objects.write().await.remove(key);
        Ok(())
    }
}
