//! In-memory versioned blob store.

use super::{BlobObject, BlobStore, ObjectVersion};
use crate::error::{BlobError, BlobResult};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredVersion {
    version_id: String,
    body: Bytes,
}

/// Blob store that keeps every version of every object in memory.
///
/// Each put appends a version; the newest one is the latest. Presigned URLs
/// use a `memory://` scheme and are descriptive only.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, Vec<StoredVersion>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions stored under `key`.
    pub fn version_count(&self, key: &str) -> usize {
        self.objects.get(key).map_or(0, |v| v.len())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list_versions(&self, key_prefix: &str) -> BlobResult<Vec<ObjectVersion>> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(key_prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();

        let mut listing = Vec::new();
        for key in keys {
            let Some(versions) = self.objects.get(&key) else {
                continue;
            };
            // Newest first, like an S3 version listing.
            for (i, version) in versions.iter().rev().enumerate() {
                listing.push(ObjectVersion {
                    key: key.clone(),
                    version_id: version.version_id.clone(),
                    is_latest: i == 0,
                });
            }
        }
        Ok(listing)
    }

    async fn get_object(&self, key: &str, version_id: Option<&str>) -> BlobResult<BlobObject> {
        let versions = self
            .objects
            .get(key)
            .ok_or_else(|| BlobError::NotFound(key.to_string()))?;

        let found = match version_id {
            Some(id) => versions.iter().find(|v| v.version_id == id),
            None => versions.last(),
        };
        let found = found.ok_or_else(|| match version_id {
            Some(id) => BlobError::NotFound(format!("{key}?versionId={id}")),
            None => BlobError::NotFound(key.to_string()),
        })?;

        Ok(BlobObject {
            content_length: found.body.len() as u64,
            body: found.body.clone(),
        })
    }

    async fn put_object(&self, key: &str, body: Bytes) -> BlobResult<Option<String>> {
        let version_id = Uuid::new_v4().simple().to_string();
        self.objects
            .entry(key.to_string())
            .or_default()
            .push(StoredVersion {
                version_id: version_id.clone(),
                body,
            });
        Ok(Some(version_id))
    }

    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> BlobResult<String> {
        Ok(format!(
            "memory:///{key}?content-type={content_type}&expires-in={}",
            ttl.as_secs()
        ))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
