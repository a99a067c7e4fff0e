//! Repository layer for database operations
//!
//! Logbook entries are stored as whole JSON documents keyed by an internal
//! id, with the user-visible entry id mirrored into its own column for
//! lookups and uniqueness.

use super::models::*;
use crate::error::{AppError, Result};
use crate::normalize::Document;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a single entry by internal id or entry id
    pub async fn find_one(&self, filter: EntryFilter<'_>) -> Result<Option<EntryRecord>> {
        let (sql, value) = match filter {
            EntryFilter::InternalId(id) => (
                "SELECT * FROM logbook_entries WHERE internal_id = ?",
                id,
            ),
            EntryFilter::EntryId(id) => ("SELECT * FROM logbook_entries WHERE entry_id = ?", id),
        };

        let record = sqlx::query_as::<_, EntryRecord>(sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Get an entry by internal id
    pub async fn get_entry(&self, internal_id: &str) -> Result<EntryRecord> {
        self.find_one(EntryFilter::InternalId(internal_id))
            .await?
            .ok_or_else(|| AppError::EntryNotFound(internal_id.to_string()))
    }

    /// List internal id and entry id of every entry, oldest first
    pub async fn list_entries(&self) -> Result<Vec<EntrySummary>> {
        let entries = sqlx::query_as::<_, EntrySummary>(
            r#"
            SELECT internal_id, entry_id AS id FROM logbook_entries
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// List every stored row including its document
    pub async fn list_records(&self) -> Result<Vec<EntryRecord>> {
        let records = sqlx::query_as::<_, EntryRecord>(
            r#"
            SELECT * FROM logbook_entries ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Insert a document, returns the new internal id
    pub async fn insert_entry(&self, document: &Document) -> Result<String> {
        let entry_id = document_entry_id(document)?;
        let internal_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let body = serde_json::to_string(document)?;

        sqlx::query(
            r#"
            INSERT INTO logbook_entries (internal_id, entry_id, document, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&internal_id)
        .bind(entry_id)
        .bind(&body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, entry_id))?;

        tracing::debug!("Inserted logbook entry: {} ({})", internal_id, entry_id);
        Ok(internal_id)
    }

    /// Replace the whole stored document of an entry
    pub async fn update_entry(&self, internal_id: &str, document: &Document) -> Result<()> {
        let entry_id = document_entry_id(document)?;
        let body = serde_json::to_string(document)?;

        let rows = sqlx::query(
            r#"
            UPDATE logbook_entries SET entry_id = ?, document = ?, updated_at = ?
            WHERE internal_id = ?
            "#,
        )
        .bind(entry_id)
        .bind(&body)
        .bind(Utc::now())
        .bind(internal_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, entry_id))?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::EntryNotFound(internal_id.to_string()));
        }

        tracing::debug!("Updated logbook entry: {}", internal_id);
        Ok(())
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn document_entry_id(document: &Document) -> Result<&str> {
    document
        .get("id")
        .and_then(|id| id.as_str())
        .ok_or_else(|| AppError::Validation("Document id must be a string".to_string()))
}

fn map_write_error(err: sqlx::Error, entry_id: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::DuplicateEntry(entry_id.to_string())
        }
        _ => AppError::Database(err),
    }
}
