use async_trait::async_trait;
use aws_sdk_s3::primitives::DateTime as S3DateTime;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use url::Url;

use super::model::{public_url_for, StoredImage};
use crate::error::StorageError;

/// Object store for task images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store `bytes` under `key`. Never overwrites: an existing key fails
    /// with [`StorageError::Conflict`].
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Publicly resolvable URL for `key`. Does not check that the object exists.
    fn public_url(&self, key: &str) -> Result<String, StorageError>;

    /// Every stored object with its last-modified time.
    async fn list_images(&self) -> Result<Vec<StoredImage>, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// S3-backed image store. Objects are served from `public_base`, which is
/// either the bucket's own endpoint or a CDN in front of it.
#[derive(Clone)]
pub struct S3ImageStore {
    client: S3Client,
    bucket_name: String,
    public_base: Url,
}

impl S3ImageStore {
    pub fn new(client: S3Client, bucket_name: impl Into<String>, public_base: Url) -> Self {
        Self {
            client,
            bucket_name: bucket_name.into(),
            public_base,
        }
    }
}

fn to_utc(time: &S3DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .cache_control("max-age=3600")
            // Conditional write: S3 rejects the put if the key already exists
            .if_none_match("*")
            .send()
            .await
            .map_err(|e| match e.raw_response().map(|r| r.status().as_u16()) {
                Some(409) | Some(412) => StorageError::Conflict(key.to_string()),
                _ => StorageError::backend("S3 put_object", DisplayErrorContext(&e)),
            })?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> Result<String, StorageError> {
        public_url_for(&self.public_base, key)
    }

    async fn list_images(&self) -> Result<Vec<StoredImage>, StorageError> {
        let mut images = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let result = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket_name)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| StorageError::backend("S3 list_objects_v2", DisplayErrorContext(&e)))?;

            images.extend(result.contents().iter().filter_map(|object| {
                object.key().map(|key| StoredImage {
                    key: key.to_string(),
                    last_modified: object.last_modified().and_then(to_utc),
                })
            }));

            match result.next_continuation_token() {
                Some(token) if result.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string())
                }
                _ => break,
            }
        }

        Ok(images)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::backend("S3 delete_object", DisplayErrorContext(&e)))?;

        Ok(())
    }
}
