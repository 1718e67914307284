//! The document record model.

use crate::error::{RecordError, RecordResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered document.
///
/// The storage key is fixed at registration as `{document_id}.{extension}`
/// and never changes; only `updated_on` moves after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub document_id: String,
    pub title: String,
    pub extension: String,
    pub key: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl DocumentRecord {
    /// Build a fresh record for an uploaded filename.
    ///
    /// The extension is everything after the last `.` (lowercased), and the
    /// title is the filename with that suffix removed, trimmed. Filenames
    /// without an extension or without a stem are rejected.
    pub fn register(filename: &str, now: DateTime<Utc>) -> RecordResult<Self> {
        let document_id = Uuid::new_v4().to_string();
        Self::register_with_id(document_id, filename, now)
    }

    /// Same as [`register`](Self::register) with a caller-chosen ID.
    pub fn register_with_id(
        document_id: impl Into<String>,
        filename: &str,
        now: DateTime<Utc>,
    ) -> RecordResult<Self> {
        let (stem, extension) = filename
            .rsplit_once('.')
            .ok_or_else(|| RecordError::InvalidFilename(filename.to_string()))?;
        let title = stem.trim();
        if title.is_empty() || extension.is_empty() {
            return Err(RecordError::InvalidFilename(filename.to_string()));
        }

        let document_id = document_id.into();
        let extension = extension.to_lowercase();
        Ok(Self {
            key: storage_key(&document_id, &extension),
            document_id,
            title: title.to_string(),
            extension,
            created_on: now,
            updated_on: now,
        })
    }
}

/// The blob key for a document: `{document_id}.{extension}`.
pub fn storage_key(document_id: &str, extension: &str) -> String {
    format!("{document_id}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_register_derives_fields() {
        let record = DocumentRecord::register_with_id("abc123", " Quarterly Report .DOCX", now())
            .unwrap();
        assert_eq!(record.document_id, "abc123");
        assert_eq!(record.title, "Quarterly Report");
        assert_eq!(record.extension, "docx");
        assert_eq!(record.key, "abc123.docx");
        assert_eq!(record.created_on, record.updated_on);
    }

    #[test]
    fn test_register_uses_last_dot() {
        let record = DocumentRecord::register_with_id("id", "archive.tar.gz", now()).unwrap();
        assert_eq!(record.title, "archive.tar");
        assert_eq!(record.extension, "gz");
        assert_eq!(record.key, "id.gz");
    }

    #[test]
    fn test_register_generates_uuid() {
        let a = DocumentRecord::register("a.txt", now()).unwrap();
        let b = DocumentRecord::register("a.txt", now()).unwrap();
        assert_ne!(a.document_id, b.document_id);
        assert!(Uuid::parse_str(&a.document_id).is_ok());
        assert_eq!(a.key, format!("{}.txt", a.document_id));
    }

    #[test]
    fn test_register_rejects_bad_names() {
        for name in ["README", "notes.", ".bashrc", "   .txt"] {
            assert!(
                matches!(
                    DocumentRecord::register(name, now()),
                    Err(RecordError::InvalidFilename(_))
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = DocumentRecord::register_with_id("abc", "a.pdf", now()).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["documentId"], "abc");
        assert_eq!(json["key"], "abc.pdf");
        assert!(json.get("createdOn").is_some());
        assert!(json.get("updatedOn").is_some());
    }
}
