//! Storage error types.

use thiserror::Error;

/// Record store operation errors.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for record store operations.
pub type RecordResult<T> = std::result::Result<T, RecordError>;

/// Blob store operation errors.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("S3 error: {0}")]
    S3(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for blob store operations.
pub type BlobResult<T> = std::result::Result<T, BlobError>;
