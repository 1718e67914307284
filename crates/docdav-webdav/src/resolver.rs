//! Metadata and content resolution.

use crate::address::{ResourceAddress, VersionToken};
use crate::cache::DocumentCache;
use crate::error::{WebDavError, WebDavResult};
use crate::metadata::ResolvedMetadata;
use bytes::Bytes;
use docdav_store::{BlobStore, DocumentRecord, ObjectVersion, RecordStore};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Resolves addresses to document records, consulting the cache first.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    records: Arc<dyn RecordStore>,
    cache: Arc<DocumentCache>,
}

impl MetadataResolver {
    pub fn new(records: Arc<dyn RecordStore>, cache: Arc<DocumentCache>) -> Self {
        Self { records, cache }
    }

    /// The root resolves to the folder stub without touching store or cache.
    pub async fn resolve(&self, addr: &ResourceAddress) -> WebDavResult<ResolvedMetadata> {
        match addr {
            ResourceAddress::Root => Ok(ResolvedMetadata::Folder),
            ResourceAddress::Document { document_id, .. } => {
                self.document(document_id).await.map(ResolvedMetadata::Document)
            }
        }
    }

    /// Look up one record. Concurrent first lookups are not de-duplicated.
    pub async fn document(&self, document_id: &str) -> WebDavResult<Arc<DocumentRecord>> {
        if let Some(record) = self.cache.metadata(document_id) {
            trace!(document_id, "metadata cache hit");
            return Ok(record);
        }

        match self.records.find_one(document_id).await {
            Ok(Some(record)) => {
                let record = Arc::new(record);
                self.cache.put_metadata(document_id, Arc::clone(&record));
                debug!(document_id, key = %record.key, "resolved document record");
                Ok(record)
            }
            Ok(None) => Err(WebDavError::NotFound(document_id.to_string())),
            Err(e) => {
                warn!(document_id, backend = self.records.backend_name(), error = %e, "record lookup failed");
                Err(e.into())
            }
        }
    }
}

/// Bytes of one document version.
#[derive(Debug, Clone)]
pub struct DocumentContent {
    pub size: u64,
    pub body: Bytes,
}

/// Selects and fetches blob versions.
#[derive(Debug, Clone)]
pub struct ContentResolver {
    blobs: Arc<dyn BlobStore>,
}

/// Pick the version to fetch from a listing of `key`.
///
/// `Latest` takes the entry flagged latest (or the first listed, if none is
/// flagged). An explicit token is always passed through verbatim.
pub fn select_version(listing: &[ObjectVersion], version: &VersionToken) -> Option<String> {
    match version {
        VersionToken::Explicit(id) => Some(id.clone()),
        VersionToken::Latest => listing
            .iter()
            .find(|v| v.is_latest)
            .or_else(|| listing.first())
            .map(|v| v.version_id.clone()),
    }
}

impl ContentResolver {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Fetch `key` at `version`.
    ///
    /// The version qualifier is only sent when the listing has at least one
    /// version of `key`; otherwise the plain object is requested. Listing
    /// and fetch failures both surface as not-found.
    pub async fn fetch(&self, key: &str, version: &VersionToken) -> WebDavResult<DocumentContent> {
        let listing: Vec<ObjectVersion> = match self.blobs.list_versions(key).await {
            Ok(listing) => listing.into_iter().filter(|v| v.key == key).collect(),
            Err(e) => {
                warn!(key, error = %e, "listing versions failed");
                return Err(e.into());
            }
        };

        let version_id = if listing.is_empty() {
            None
        } else {
            select_version(&listing, version)
        };
        trace!(key, %version, versions = listing.len(), ?version_id, "selected version");

        let object = self
            .blobs
            .get_object(key, version_id.as_deref())
            .await
            .inspect_err(|e| debug!(key, ?version_id, error = %e, "fetching object failed"))?;

        Ok(DocumentContent {
            size: object.content_length,
            body: object.body,
        })
    }
}
