//! Blob store wrapper that counts calls, for asserting on store traffic.

use async_trait::async_trait;
use bytes::Bytes;
use docdav_store::{BlobObject, BlobResult, BlobStore, MemoryBlobStore, ObjectVersion};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct CountingBlobStore {
    pub inner: MemoryBlobStore,
    lists: AtomicUsize,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl CountingBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for CountingBlobStore {
    async fn list_versions(&self, key_prefix: &str) -> BlobResult<Vec<ObjectVersion>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_versions(key_prefix).await
    }

    async fn get_object(&self, key: &str, version_id: Option<&str>) -> BlobResult<BlobObject> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_object(key, version_id).await
    }

    async fn put_object(&self, key: &str, body: Bytes) -> BlobResult<Option<String>> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_object(key, body).await
    }

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> BlobResult<String> {
        self.inner.presign_put(key, content_type, ttl).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}
