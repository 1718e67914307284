//! Storage backends for docdav.
//!
//! Two capabilities back the WebDAV adapter:
//!
//! - [`RecordStore`]: document records keyed by document ID
//!   ([`MemoryRecordStore`], [`SqliteRecordStore`])
//! - [`BlobStore`]: versioned document content keyed by storage key
//!   ([`MemoryBlobStore`], [`S3BlobStore`])

pub mod blobs;
pub mod error;
pub mod record;
pub mod records;

pub use blobs::{BlobObject, BlobStore, MemoryBlobStore, ObjectVersion, S3BlobStore, S3Settings};
pub use error::{BlobError, BlobResult, RecordError, RecordResult};
pub use record::{DocumentRecord, storage_key};
pub use records::{MemoryRecordStore, RecordStore, SqliteRecordStore};
