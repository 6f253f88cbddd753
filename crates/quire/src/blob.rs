//! Blob collaborator.
//!
//! Object bytes never pass through the engine. Callers upload and download
//! through presigned URLs; the engine only asks for URLs and deletes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use quire_core::now_millis;
use thiserror::Error;

/// Errors from the blob backend.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob backend error: {0}")]
    Backend(String),
}

/// Presigned access and deletion over a blob backend.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn presigned_get_url(&self, bucket: &str, key: &str, ttl: Duration)
        -> Result<String, BlobError>;

    async fn presigned_put_url(&self, bucket: &str, key: &str, ttl: Duration)
        -> Result<String, BlobError>;

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), BlobError>;
}

/// In-memory blob backend that hands out `memory://` URLs and records removals.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    removed: Mutex<Vec<(String, String)>>,
    fail_removals: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent removal fail.
    pub fn fail_removals(&self, fail: bool) {
        self.fail_removals.store(fail, Ordering::SeqCst);
    }

    /// `(bucket, key)` pairs removed so far.
    pub fn removed(&self) -> Vec<(String, String)> {
        self.removed
            .lock()
            .map(|removed| removed.clone())
            .unwrap_or_default()
    }

    fn url(method: &str, bucket: &str, key: &str, ttl: Duration) -> String {
        let expires = now_millis() + ttl.as_millis() as i64;
        format!("memory://{}/{}?method={}&expires={}", bucket, key, method, expires)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, BlobError> {
        Ok(Self::url("GET", bucket, key, ttl))
    }

    async fn presigned_put_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, BlobError> {
        Ok(Self::url("PUT", bucket, key, ttl))
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> Result<(), BlobError> {
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(BlobError::Backend(format!(
                "removal of {}/{} rejected",
                bucket, key
            )));
        }
        self.removed
            .lock()
            .map_err(|e| BlobError::Backend(e.to_string()))?
            .push((bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_urls_name_method_and_path() {
        let blobs = MemoryBlobStore::new();
        let url = blobs
            .presigned_put_url("photos", "cat.png", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(url.starts_with("memory://photos/cat.png?method=PUT"));
    }

    #[tokio::test]
    async fn test_removal_failure_switch() {
        let blobs = MemoryBlobStore::new();
        blobs.remove_object("b", "k").await.unwrap();
        blobs.fail_removals(true);
        assert!(blobs.remove_object("b", "k2").await.is_err());
        assert_eq!(blobs.removed(), vec![("b".to_string(), "k".to_string())]);
    }
}
