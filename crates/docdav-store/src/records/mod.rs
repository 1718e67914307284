//! Document record stores.

mod memory;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use crate::error::RecordResult;
use crate::record::DocumentRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Keyed access to document records.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Look up a record by document ID.
    async fn find_one(&self, document_id: &str) -> RecordResult<Option<DocumentRecord>>;

    /// Set `updated_on` for an existing record.
    ///
    /// Fails with [`RecordError::NotFound`](crate::RecordError::NotFound)
    /// when no record has this ID.
    async fn touch_updated_on(
        &self,
        document_id: &str,
        updated_on: DateTime<Utc>,
    ) -> RecordResult<()>;

    /// Insert a new record. Document IDs are unique.
    async fn create(&self, record: &DocumentRecord) -> RecordResult<()>;

    /// All records, oldest first.
    async fn find_all(&self) -> RecordResult<Vec<DocumentRecord>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
