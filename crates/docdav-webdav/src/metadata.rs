//! WebDAV metadata for the root collection and for documents.

use crate::etag::etag_value;
use chrono::{DateTime, Utc};
use dav_server::fs::{DavMetaData, FsError};
use docdav_store::DocumentRecord;
use std::sync::Arc;
use std::time::SystemTime;

/// What a path resolves to. Everything below the root is a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Folder,
    File,
}

/// Result of metadata resolution: the synthetic root folder or a record.
#[derive(Debug, Clone)]
pub enum ResolvedMetadata {
    /// The root stub: a folder with an empty name and size 0.
    Folder,
    Document(Arc<DocumentRecord>),
}

impl ResolvedMetadata {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResolvedMetadata::Folder => ResourceKind::Folder,
            ResolvedMetadata::Document(_) => ResourceKind::File,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ResolvedMetadata::Folder => "",
            ResolvedMetadata::Document(record) => &record.title,
        }
    }

    pub fn record(&self) -> Option<&Arc<DocumentRecord>> {
        match self {
            ResolvedMetadata::Folder => None,
            ResolvedMetadata::Document(record) => Some(record),
        }
    }
}

/// Metadata handed to dav-server.
#[derive(Debug, Clone)]
pub enum DocumentMetaData {
    Root,
    File(FileMetaData),
}

#[derive(Debug, Clone)]
pub struct FileMetaData {
    pub size: u64,
    /// Both creation and modification time report `created_on`.
    pub created: SystemTime,
    /// Unquoted tag derived from `updated_on`.
    pub etag: String,
}

impl DocumentMetaData {
    pub fn root() -> Self {
        DocumentMetaData::Root
    }

    pub fn from_record(record: &DocumentRecord, size: u64) -> Self {
        DocumentMetaData::File(FileMetaData {
            size,
            created: SystemTime::from(record.created_on),
            etag: etag_value(&record.updated_on),
        })
    }

    /// Metadata for an open write handle that has buffered `size` bytes.
    pub fn pending(created_on: DateTime<Utc>, updated_on: DateTime<Utc>, size: u64) -> Self {
        DocumentMetaData::File(FileMetaData {
            size,
            created: SystemTime::from(created_on),
            etag: etag_value(&updated_on),
        })
    }
}

impl DavMetaData for DocumentMetaData {
    fn len(&self) -> u64 {
        match self {
            DocumentMetaData::Root => 0,
            DocumentMetaData::File(f) => f.size,
        }
    }

    fn modified(&self) -> Result<SystemTime, FsError> {
        match self {
            DocumentMetaData::Root => Ok(SystemTime::UNIX_EPOCH),
            DocumentMetaData::File(f) => Ok(f.created),
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, DocumentMetaData::Root)
    }

    fn etag(&self) -> Option<String> {
        match self {
            DocumentMetaData::Root => None,
            DocumentMetaData::File(f) => Some(f.etag.clone()),
        }
    }

    fn created(&self) -> Result<SystemTime, FsError> {
        self.modified()
    }

    fn executable(&self) -> Result<bool, FsError> {
        Ok(false)
    }
}
