//! Error handling and mapping for the WebDAV adapter.
//!
//! Record-store misses, blob listing failures and blob fetch failures are
//! deliberately indistinguishable to clients: every storage failure maps to
//! [`FsError::NotFound`]. The rejected structural operations map to
//! [`FsError::NotImplemented`].

use dav_server::fs::FsError;
use docdav_store::{BlobError, RecordError};
use std::io;
use thiserror::Error;

/// Errors that can occur while serving a document.
#[derive(Debug, Error)]
pub enum WebDavError {
    /// Record store failure (boxed to reduce enum size).
    #[error("Record store failed: {0}")]
    Record(Box<RecordError>),

    /// Blob store failure (boxed to reduce enum size).
    #[error("Blob store failed: {0}")]
    Blob(Box<BlobError>),

    /// No such document, version, or object.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Create, delete, rename and directory listing are never supported.
    #[error("Operation not supported")]
    NotSupported,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed request body on the HTTP glue endpoints.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Server error.
    #[error("Server error: {0}")]
    Server(String),
}

impl WebDavError {
    /// Converts this error to a dav-server FsError.
    pub fn to_fs_error(&self) -> FsError {
        match self {
            WebDavError::Record(_) | WebDavError::Blob(_) | WebDavError::NotFound(_) => {
                FsError::NotFound
            }
            WebDavError::NotSupported => FsError::NotImplemented,
            WebDavError::Io(_) | WebDavError::InvalidRequest(_) | WebDavError::Server(_) => {
                FsError::GeneralFailure
            }
        }
    }

    /// True for anything a client sees as 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self.to_fs_error(), FsError::NotFound)
    }
}

/// Result type for WebDAV operations.
pub type WebDavResult<T> = Result<T, WebDavError>;

// Manual From implementations to box errors for smaller enum size
impl From<RecordError> for WebDavError {
    fn from(e: RecordError) -> Self {
        WebDavError::Record(Box::new(e))
    }
}

impl From<BlobError> for WebDavError {
    fn from(e: BlobError) -> Self {
        WebDavError::Blob(Box::new(e))
    }
}

impl From<WebDavError> for FsError {
    fn from(e: WebDavError) -> Self {
        e.to_fs_error()
    }
}
