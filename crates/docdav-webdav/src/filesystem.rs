//! The virtual filesystem adapter.
//!
//! `DocumentFs` exposes documents as a flat, read-mostly tree: the root is
//! the only collection, and every `/{document_id}/{version}/...` path below
//! it is a file backed by a record and a versioned blob. Content can be read
//! and overwritten; creating, deleting, renaming and listing are rejected.
//!
//! The provider contract is available twice: as plain async methods taking a
//! [`ResourceAddress`], and through `DavFileSystem` for dav-server.

use crate::address::ResourceAddress;
use crate::cache::DocumentCache;
use crate::config::AdapterConfig;
use crate::error::{WebDavError, WebDavResult};
use crate::etag::{OCTET_STREAM, etag, if_none_match, mime_type};
use crate::file::{DocumentFile, WriteSink, WriteTarget};
use crate::metadata::{DocumentMetaData, ResolvedMetadata, ResourceKind};
use crate::props::PropertyManager;
use crate::resolver::{ContentResolver, MetadataResolver};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dav_server::davpath::DavPath;
use dav_server::fs::{
    DavDirEntry, DavFile, DavFileSystem, DavMetaData, DavProp, FsError, FsFuture, FsStream,
    OpenOptions, ReadDirMeta,
};
use dav_server::memls::MemLs;
use docdav_store::{BlobStore, DocumentRecord, RecordError, RecordStore};
use hyper::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, trace};

/// Outcome of a conditional read.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    /// `If-None-Match` matched; the blob was not fetched.
    NotModified { etag: String },
    Content {
        etag: String,
        content_type: String,
        size: u64,
        body: Bytes,
    },
}

/// WebDAV filesystem over a record store and a versioned blob store.
#[derive(Clone)]
pub struct DocumentFs {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    cache: Arc<DocumentCache>,
    resolver: MetadataResolver,
    content: ContentResolver,
    config: AdapterConfig,
}

impl std::fmt::Debug for DocumentFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentFs")
            .field("records", &self.records.backend_name())
            .field("blobs", &self.blobs.backend_name())
            .field("cache_enabled", &self.cache.is_enabled())
            .field("write_mode", &self.config.write_mode)
            .finish_non_exhaustive()
    }
}

impl DocumentFs {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        config: AdapterConfig,
    ) -> Self {
        let cache = Arc::new(DocumentCache::new(&config.cache));
        Self::with_cache(records, blobs, cache, config)
    }

    /// Build an adapter around an existing cache.
    pub fn with_cache(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<DocumentCache>,
        config: AdapterConfig,
    ) -> Self {
        Self {
            resolver: MetadataResolver::new(Arc::clone(&records), Arc::clone(&cache)),
            content: ContentResolver::new(Arc::clone(&blobs)),
            records,
            blobs,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Record or root stub for an address.
    pub async fn metadata(&self, addr: &ResourceAddress) -> WebDavResult<ResolvedMetadata> {
        self.resolver.resolve(addr).await
    }

    /// Content length of the addressed version.
    pub async fn size(&self, addr: &ResourceAddress) -> WebDavResult<u64> {
        let ResourceAddress::Document {
            document_id,
            version,
        } = addr
        else {
            return Ok(0);
        };
        // Sizes are cached per document, so only for the moving "latest".
        if version.is_latest()
            && let Some(size) = self.cache.size(document_id)
        {
            return Ok(size);
        }

        let record = self.resolver.document(document_id).await?;
        let content = self.content.fetch(&record.key, version).await?;
        if version.is_latest() {
            self.cache.put_size(document_id, content.size);
        }
        Ok(content.size)
    }

    pub async fn resource_type(&self, addr: &ResourceAddress) -> WebDavResult<ResourceKind> {
        let Some(document_id) = addr.document_id() else {
            return Ok(ResourceKind::Folder);
        };
        if let Some(kind) = self.cache.kind(document_id) {
            return Ok(kind);
        }
        let kind = self.metadata(addr).await?.kind();
        self.cache.put_kind(document_id, kind);
        Ok(kind)
    }

    pub async fn creation_date(&self, addr: &ResourceAddress) -> WebDavResult<DateTime<Utc>> {
        Ok(match self.metadata(addr).await? {
            ResolvedMetadata::Folder => DateTime::UNIX_EPOCH,
            ResolvedMetadata::Document(record) => record.created_on,
        })
    }

    /// Same as the creation date.
    pub async fn last_modified_date(&self, addr: &ResourceAddress) -> WebDavResult<DateTime<Utc>> {
        self.creation_date(addr).await
    }

    pub async fn mime_type(&self, addr: &ResourceAddress) -> WebDavResult<String> {
        Ok(match self.metadata(addr).await? {
            ResolvedMetadata::Folder => OCTET_STREAM.to_string(),
            ResolvedMetadata::Document(record) => mime_type(&record.extension),
        })
    }

    /// Read a document, honouring `If-None-Match`.
    ///
    /// The ETag comes from the record alone, so a matching conditional read
    /// never reaches the blob store.
    #[instrument(level = "debug", skip(self), fields(addr = %addr))]
    pub async fn open_read(
        &self,
        addr: &ResourceAddress,
        if_none_match_header: Option<&str>,
    ) -> WebDavResult<ReadOutcome> {
        let ResourceAddress::Document {
            document_id,
            version,
        } = addr
        else {
            return Err(WebDavError::NotFound(addr.to_string()));
        };

        let record = self.resolver.document(document_id).await?;
        let etag = etag(&record.updated_on);
        if let Some(header) = if_none_match_header
            && if_none_match(header, &etag)
        {
            debug!(etag = %etag, "not modified");
            return Ok(ReadOutcome::NotModified { etag });
        }

        let content = self.content.fetch(&record.key, version).await?;
        trace!(size = content.size, "read content");
        Ok(ReadOutcome::Content {
            etag,
            content_type: mime_type(&record.extension),
            size: content.size,
            body: content.body,
        })
    }

    /// Start an upload for the addressed document.
    ///
    /// The version segment is ignored: writes always create a new version
    /// of the document's key.
    #[instrument(level = "debug", skip(self), fields(addr = %addr))]
    pub async fn open_write(&self, addr: &ResourceAddress) -> WebDavResult<WriteSink> {
        let Some(document_id) = addr.document_id() else {
            return Err(WebDavError::NotFound(addr.to_string()));
        };
        let record = self.resolver.document(document_id).await?;
        Ok(WriteSink::new(
            record,
            WriteTarget {
                records: Arc::clone(&self.records),
                blobs: Arc::clone(&self.blobs),
                cache: Arc::clone(&self.cache),
                mode: self.config.write_mode,
            },
        ))
    }

    /// The per-document lock manager. Fails for unknown documents.
    pub async fn lock_manager(&self, addr: &ResourceAddress) -> WebDavResult<Arc<MemLs>> {
        self.metadata(addr).await?;
        Ok(self.cache.lock_manager(addr.document_id()))
    }

    /// The per-document property manager. Fails for unknown documents.
    pub async fn property_manager(
        &self,
        addr: &ResourceAddress,
    ) -> WebDavResult<Arc<PropertyManager>> {
        self.metadata(addr).await?;
        Ok(self.cache.property_manager(addr.document_id()))
    }

    /// Register a new document and presign the upload of its first version.
    ///
    /// The record is only created once the upload URL has been issued.
    pub async fn register(
        &self,
        filename: &str,
        content_type: &str,
        ttl: Duration,
    ) -> WebDavResult<(DocumentRecord, String)> {
        let record = DocumentRecord::register(filename, Utc::now()).map_err(|e| match e {
            RecordError::InvalidFilename(name) => {
                WebDavError::InvalidRequest(format!("invalid filename: {name:?}"))
            }
            other => other.into(),
        })?;
        let signed_url = self
            .blobs
            .presign_put(&record.key, content_type, ttl)
            .await
            .map_err(|e| WebDavError::Server(e.to_string()))?;
        self.records
            .create(&record)
            .await
            .map_err(|e| WebDavError::Server(e.to_string()))?;

        info!(document_id = %record.document_id, key = %record.key, "registered document");
        Ok((record, signed_url))
    }

    pub async fn create(&self, _addr: &ResourceAddress) -> WebDavResult<()> {
        Err(WebDavError::NotSupported)
    }

    pub async fn delete(&self, _addr: &ResourceAddress) -> WebDavResult<()> {
        Err(WebDavError::NotSupported)
    }

    pub async fn rename(&self, _from: &ResourceAddress, _to: &ResourceAddress) -> WebDavResult<()> {
        Err(WebDavError::NotSupported)
    }

    pub async fn read_dir(&self, _addr: &ResourceAddress) -> WebDavResult<()> {
        Err(WebDavError::NotSupported)
    }

    async fn dav_metadata(&self, addr: &ResourceAddress) -> WebDavResult<DocumentMetaData> {
        match self.metadata(addr).await? {
            ResolvedMetadata::Folder => Ok(DocumentMetaData::root()),
            ResolvedMetadata::Document(record) => {
                let size = self.size(addr).await?;
                Ok(DocumentMetaData::from_record(&record, size))
            }
        }
    }
}

impl DavFileSystem for DocumentFs {
    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn open<'a>(
        &'a self,
        path: &'a DavPath,
        options: OpenOptions,
    ) -> FsFuture<'a, Box<dyn DavFile>> {
        Box::pin(async move {
            let addr = ResourceAddress::from_dav_path(path);
            debug!(addr = %addr, options = ?options, "Opening file");

            if options.append {
                return Err(FsError::NotImplemented);
            }
            if options.write || options.create || options.create_new || options.truncate {
                let sink = self.open_write(&addr).await?;
                return Ok(Box::new(DocumentFile::writer(sink)) as Box<dyn DavFile>);
            }

            let ReadOutcome::Content { size, body, .. } = self.open_read(&addr, None).await? else {
                return Err(FsError::GeneralFailure);
            };
            let meta = match self.metadata(&addr).await? {
                ResolvedMetadata::Document(record) => DocumentMetaData::from_record(&record, size),
                ResolvedMetadata::Folder => DocumentMetaData::root(),
            };
            Ok(Box::new(DocumentFile::reader(body, meta)) as Box<dyn DavFile>)
        })
    }

    fn read_dir<'a>(
        &'a self,
        path: &'a DavPath,
        _meta: ReadDirMeta,
    ) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        Box::pin(async move {
            self.read_dir(&ResourceAddress::from_dav_path(path)).await?;
            Err(FsError::NotImplemented)
        })
    }

    #[instrument(level = "debug", skip(self), fields(path = %path.as_url_string()))]
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        Box::pin(async move {
            let addr = ResourceAddress::from_dav_path(path);
            let meta = self.dav_metadata(&addr).await?;
            Ok(Box::new(meta) as Box<dyn DavMetaData>)
        })
    }

    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.create(&ResourceAddress::from_dav_path(path)).await?;
            Ok(())
        })
    }

    fn remove_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.delete(&ResourceAddress::from_dav_path(path)).await?;
            Ok(())
        })
    }

    fn remove_file<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.delete(&ResourceAddress::from_dav_path(path)).await?;
            Ok(())
        })
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            let from = ResourceAddress::from_dav_path(from);
            let to = ResourceAddress::from_dav_path(to);
            self.rename(&from, &to).await?;
            Ok(())
        })
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.create(&ResourceAddress::from_dav_path(to)).await?;
            trace!(from = %from.as_url_string(), "copy rejected");
            Ok(())
        })
    }

    fn have_props<'a>(
        &'a self,
        _path: &'a DavPath,
    ) -> std::pin::Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async { true })
    }

    fn patch_props<'a>(
        &'a self,
        path: &'a DavPath,
        patch: Vec<(bool, DavProp)>,
    ) -> FsFuture<'a, Vec<(StatusCode, DavProp)>> {
        Box::pin(async move {
            let manager = self
                .property_manager(&ResourceAddress::from_dav_path(path))
                .await?;
            Ok(manager.patch(patch))
        })
    }

    fn get_props<'a>(&'a self, path: &'a DavPath, do_content: bool) -> FsFuture<'a, Vec<DavProp>> {
        Box::pin(async move {
            let manager = self
                .property_manager(&ResourceAddress::from_dav_path(path))
                .await?;
            Ok(manager.list(do_content))
        })
    }

    fn get_prop<'a>(&'a self, path: &'a DavPath, prop: DavProp) -> FsFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let manager = self
                .property_manager(&ResourceAddress::from_dav_path(path))
                .await?;
            manager.get(&prop).ok_or(FsError::NotFound)
        })
    }
}
