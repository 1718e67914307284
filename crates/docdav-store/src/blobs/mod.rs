//! Versioned blob stores.

mod memory;
mod s3;

pub use memory::MemoryBlobStore;
pub use s3::{S3BlobStore, S3Settings};

use crate::error::BlobResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// One stored version of an object, as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
}

/// A fetched object body.
#[derive(Debug, Clone)]
pub struct BlobObject {
    pub content_length: u64,
    pub body: Bytes,
}

/// Key/version-addressed object storage.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// List every version of every object whose key starts with `key_prefix`.
    async fn list_versions(&self, key_prefix: &str) -> BlobResult<Vec<ObjectVersion>>;

    /// Fetch an object, optionally pinned to a version.
    async fn get_object(&self, key: &str, version_id: Option<&str>) -> BlobResult<BlobObject>;

    /// Replace the object at `key` with `body` in a single request.
    ///
    /// Returns the new version ID when the backend reports one.
    async fn put_object(&self, key: &str, body: Bytes) -> BlobResult<Option<String>>;

    /// A URL a client can PUT the object to directly, valid for `ttl`.
    async fn presign_put(&self, key: &str, content_type: &str, ttl: Duration)
    -> BlobResult<String>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
