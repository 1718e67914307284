//! In-memory record store.

use super::RecordStore;
use crate::error::{RecordError, RecordResult};
use crate::record::DocumentRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Record store backed by a concurrent map. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: DashMap<String, DocumentRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find_one(&self, document_id: &str) -> RecordResult<Option<DocumentRecord>> {
        Ok(self.records.get(document_id).map(|r| r.value().clone()))
    }

    async fn touch_updated_on(
        &self,
        document_id: &str,
        updated_on: DateTime<Utc>,
    ) -> RecordResult<()> {
        let mut record = self
            .records
            .get_mut(document_id)
            .ok_or_else(|| RecordError::NotFound(document_id.to_string()))?;
        record.updated_on = updated_on;
        Ok(())
    }

    async fn create(&self, record: &DocumentRecord) -> RecordResult<()> {
        match self.records.entry(record.document_id.clone()) {
            Entry::Occupied(_) => Err(RecordError::AlreadyExists(record.document_id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn find_all(&self) -> RecordResult<Vec<DocumentRecord>> {
        let mut all: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| {
            a.created_on
                .cmp(&b.created_on)
                .then_with(|| a.document_id.cmp(&b.document_id))
        });
        Ok(all)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
