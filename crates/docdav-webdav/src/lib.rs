//! WebDAV access to stored documents.
//!
//! This crate exposes documents held in a record store plus a versioned
//! blob store as a flat WebDAV tree, so desktop office applications can open
//! and save them in place.
//!
//! # Addressing
//!
//! Paths below the WebDAV prefix have the form
//! `/{document_id}/{version}/{anything}`:
//!
//! - `version` is a blob version identifier, or `latest` (also the default
//!   when the segment is missing)
//! - trailing segments are ignored, so clients can append a file name
//! - the root is a synthetic, empty collection
//!
//! Reads resolve the record, pick the requested version, and stream it back
//! with an ETag derived from the record's `updatedOn`. Writes buffer the
//! body, store a new blob version on flush, then stamp `updatedOn`.
//! Creating, deleting, renaming and listing are not supported.
//!
//! # Example
//!
//! ```ignore
//! use docdav_store::{MemoryBlobStore, MemoryRecordStore};
//! use docdav_webdav::{AdapterConfig, DocumentFs, ServerConfig, WebDavServer};
//! use std::sync::Arc;
//!
//! let fs = DocumentFs::new(
//!     Arc::new(MemoryRecordStore::new()),
//!     Arc::new(MemoryBlobStore::new()),
//!     AdapterConfig::default(),
//! );
//! let server = WebDavServer::start(fs, ServerConfig::default()).await?;
//! println!("Mount via: {}", server.webdav_url());
//! ```
//!
//! # Security
//!
//! By default, the server binds to localhost (127.0.0.1) only.
//! No authentication is performed.

pub mod address;
pub mod cache;
pub mod config;
mod error;
pub mod etag;
mod file;
mod filesystem;
mod locks;
mod metadata;
mod props;
mod resolver;
mod server;

// Public exports
pub use address::{ResourceAddress, VersionToken};
pub use cache::{CacheStats, DocumentCache};
pub use config::{AdapterConfig, CacheConfig, WriteMode};
pub use error::{WebDavError, WebDavResult};
pub use file::{DocumentFile, WriteSink};
pub use filesystem::{DocumentFs, ReadOutcome};
pub use locks::DocumentLockSystem;
pub use metadata::{DocumentMetaData, ResolvedMetadata, ResourceKind};
pub use props::PropertyManager;
pub use resolver::{ContentResolver, DocumentContent, MetadataResolver, select_version};
pub use server::{ALLOWED_METHODS, ServerConfig, WebDavServer};
