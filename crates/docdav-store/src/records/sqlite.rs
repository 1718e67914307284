//! SQLite-backed record store.

use super::RecordStore;
use crate::error::{RecordError, RecordResult};
use crate::record::DocumentRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    document_id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    extension TEXT NOT NULL,
    key TEXT NOT NULL,
    created_on TEXT NOT NULL,
    updated_on TEXT NOT NULL
)";

const SELECT_COLUMNS: &str =
    "SELECT document_id, title, extension, key, created_on, updated_on FROM documents";

/// Record store persisted in a single SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
}

impl SqliteRecordStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn new(path: impl AsRef<Path>) -> RecordResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        info!(path = %path.display(), "Opened SQLite record store");
        Ok(store)
    }

    async fn migrate(&self) -> RecordResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn record_from_row(row: &SqliteRow) -> RecordResult<DocumentRecord> {
    Ok(DocumentRecord {
        document_id: row.try_get("document_id")?,
        title: row.try_get("title")?,
        extension: row.try_get("extension")?,
        key: row.try_get("key")?,
        created_on: row.try_get("created_on")?,
        updated_on: row.try_get("updated_on")?,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn find_one(&self, document_id: &str) -> RecordResult<Option<DocumentRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE document_id = ?"))
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn touch_updated_on(
        &self,
        document_id: &str,
        updated_on: DateTime<Utc>,
    ) -> RecordResult<()> {
        let result = sqlx::query("UPDATE documents SET updated_on = ? WHERE document_id = ?")
            .bind(updated_on)
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RecordError::NotFound(document_id.to_string()));
        }
        debug!(document_id, %updated_on, "Updated document timestamp");
        Ok(())
    }

    async fn create(&self, record: &DocumentRecord) -> RecordResult<()> {
        let result = sqlx::query(
            "INSERT INTO documents (document_id, title, extension, key, created_on, updated_on) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.document_id)
        .bind(&record.title)
        .bind(&record.extension)
        .bind(&record.key)
        .bind(record.created_on)
        .bind(record.updated_on)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(RecordError::AlreadyExists(record.document_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_all(&self) -> RecordResult<Vec<DocumentRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_on, document_id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
