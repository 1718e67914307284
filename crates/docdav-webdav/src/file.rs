//! WebDAV file handles for documents.
//!
//! Readers hold one fetched version and only move forward. Writers buffer
//! every chunk in memory and commit once, as a single full-object put, when
//! the protocol engine flushes at the end of the request body. A writer that
//! is dropped before that flush (client disconnected mid-upload) writes
//! nothing and leaves the record untouched.

use crate::cache::DocumentCache;
use crate::config::WriteMode;
use crate::error::WebDavResult;
use crate::metadata::DocumentMetaData;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use dav_server::fs::{DavFile, DavMetaData, FsError, FsFuture};
use docdav_store::{BlobStore, DocumentRecord, RecordStore};
use std::io::SeekFrom;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Stores a finished upload is committed to.
#[derive(Debug, Clone)]
pub(crate) struct WriteTarget {
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub cache: Arc<DocumentCache>,
    pub mode: WriteMode,
}

/// In-memory sink for one document upload.
#[derive(Debug)]
pub struct WriteSink {
    record: Arc<DocumentRecord>,
    chunks: Vec<Bytes>,
    len: u64,
    committed: bool,
    target: WriteTarget,
}

impl WriteSink {
    pub(crate) fn new(record: Arc<DocumentRecord>, target: WriteTarget) -> Self {
        Self {
            record,
            chunks: Vec::new(),
            len: 0,
            committed: false,
            target,
        }
    }

    pub fn record(&self) -> &DocumentRecord {
        &self.record
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn push(&mut self, chunk: Bytes) {
        self.len += chunk.len() as u64;
        self.chunks.push(chunk);
    }

    /// Upload the buffered body and stamp `updated_on`.
    ///
    /// Runs at most once; later calls are no-ops.
    pub async fn finish(&mut self) -> WebDavResult<()> {
        if self.committed {
            return Ok(());
        }
        self.committed = true;

        let body = concat(std::mem::take(&mut self.chunks));
        let key = self.record.key.clone();
        let document_id = self.record.document_id.as_str();
        debug!(document_id, key = %key, size = body.len(), mode = ?self.target.mode, "committing upload");

        match self.target.mode {
            WriteMode::Ordered => {
                self.target.blobs.put_object(&key, body).await?;
            }
            WriteMode::Detached => {
                let blobs = Arc::clone(&self.target.blobs);
                tokio::spawn(async move {
                    if let Err(e) = blobs.put_object(&key, body).await {
                        error!(key = %key, error = %e, "background upload failed");
                    }
                });
            }
        }

        let updated_on = Utc::now();
        self.target
            .records
            .touch_updated_on(document_id, updated_on)
            .await?;

        let mut updated = DocumentRecord::clone(&self.record);
        updated.updated_on = updated_on;
        let updated = Arc::new(updated);
        self.target.cache.refresh_after_write(Arc::clone(&updated));

        info!(document_id, size = self.len, "document updated");
        self.record = updated;
        Ok(())
    }
}

fn concat(mut chunks: Vec<Bytes>) -> Bytes {
    match chunks.len() {
        0 => Bytes::new(),
        1 => chunks.pop().unwrap_or_default(),
        _ => {
            let total = chunks.iter().map(Bytes::len).sum();
            let mut buf = BytesMut::with_capacity(total);
            for chunk in &chunks {
                buf.extend_from_slice(chunk);
            }
            buf.freeze()
        }
    }
}

/// A file handle for WebDAV operations.
pub enum DocumentFile {
    /// Forward-only reader over one fetched version.
    Reader(ReaderHandle),
    /// Buffering writer for PUT requests.
    Writer(WriteSink),
}

impl std::fmt::Debug for DocumentFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFile::Reader(h) => f
                .debug_struct("DocumentFile::Reader")
                .field("position", &h.position)
                .field("size", &h.body.len())
                .finish(),
            DocumentFile::Writer(w) => f
                .debug_struct("DocumentFile::Writer")
                .field("document_id", &w.record.document_id)
                .field("buffered", &w.len)
                .field("committed", &w.committed)
                .finish(),
        }
    }
}

/// Handle for read-only access.
pub struct ReaderHandle {
    body: Bytes,
    position: usize,
    meta: DocumentMetaData,
}

impl DocumentFile {
    pub fn reader(body: Bytes, meta: DocumentMetaData) -> Self {
        DocumentFile::Reader(ReaderHandle {
            body,
            position: 0,
            meta,
        })
    }

    pub fn writer(sink: WriteSink) -> Self {
        DocumentFile::Writer(sink)
    }
}

impl ReaderHandle {
    fn seek_to(&mut self, target: i64) -> Result<u64, FsError> {
        let target = usize::try_from(target).map_err(|_| FsError::GeneralFailure)?;
        if target < self.position {
            // Content is a single-pass stream.
            return Err(FsError::NotImplemented);
        }
        self.position = target.min(self.body.len());
        Ok(self.position as u64)
    }
}

/// `base + delta`, failing instead of overflowing.
fn offset(base: usize, delta: i64) -> Result<i64, FsError> {
    i64::try_from(base)
        .ok()
        .and_then(|base| base.checked_add(delta))
        .ok_or(FsError::GeneralFailure)
}

impl DavFile for DocumentFile {
    fn metadata(&mut self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        Box::pin(async move {
            let meta = match self {
                DocumentFile::Reader(h) => h.meta.clone(),
                DocumentFile::Writer(w) => {
                    DocumentMetaData::pending(w.record.created_on, w.record.updated_on, w.len)
                }
            };
            Ok(Box::new(meta) as Box<dyn DavMetaData>)
        })
    }

    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        Box::pin(async move {
            match self {
                DocumentFile::Reader(h) => {
                    let end = h.position.saturating_add(count).min(h.body.len());
                    let chunk = h.body.slice(h.position..end);
                    h.position = end;
                    Ok(chunk)
                }
                DocumentFile::Writer(_) => Err(FsError::Forbidden),
            }
        })
    }

    fn write_bytes(&mut self, buf: Bytes) -> FsFuture<'_, ()> {
        Box::pin(async move {
            match self {
                DocumentFile::Reader(_) => Err(FsError::Forbidden),
                DocumentFile::Writer(w) if w.committed => Err(FsError::GeneralFailure),
                DocumentFile::Writer(w) => {
                    w.push(buf);
                    Ok(())
                }
            }
        })
    }

    fn write_buf(&mut self, mut buf: Box<dyn bytes::Buf + Send>) -> FsFuture<'_, ()> {
        Box::pin(async move {
            let bytes = buf.copy_to_bytes(buf.remaining());
            self.write_bytes(bytes).await
        })
    }

    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64> {
        Box::pin(async move {
            match self {
                DocumentFile::Reader(h) => {
                    let target = match pos {
                        SeekFrom::Start(n) => i64::try_from(n).map_err(|_| FsError::GeneralFailure)?,
                        SeekFrom::End(n) => offset(h.body.len(), n)?,
                        SeekFrom::Current(n) => offset(h.position, n)?,
                    };
                    h.seek_to(target)
                }
                DocumentFile::Writer(w) => {
                    // Uploads are appended in order; only "seek to where we are" is allowed.
                    let target = match pos {
                        SeekFrom::Start(n) => Some(n),
                        SeekFrom::End(0) | SeekFrom::Current(0) => Some(w.len),
                        _ => None,
                    };
                    match target {
                        Some(n) if n == w.len => Ok(n),
                        _ => Err(FsError::NotImplemented),
                    }
                }
            }
        })
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        Box::pin(async move {
            match self {
                DocumentFile::Reader(_) => Ok(()),
                DocumentFile::Writer(w) => w.finish().await.map_err(FsError::from),
            }
        })
    }
}
