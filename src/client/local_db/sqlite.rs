//! # SQLite Backend
//!
//! Transactional structured store. All collections share one table keyed by
//! an autoincrement id, so ids are unique and ordered by insertion.

use crate::client::local_db::{schema, Result, StoredRow};
use crate::shared::{RecordId, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create the database file and apply the schema
    ///
    /// Uses WAL mode for concurrent readers while a replay is writing.
    pub async fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Err(StoreError::unavailable(format!(
                "{} is a directory",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;
        sqlx::query("PRAGMA temp_store=MEMORY").execute(&pool).await?;

        schema::apply(&pool).await?;

        tracing::debug!("SQLite store ready at {}", path.display());
        Ok(Self { pool })
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn put(&self, collection: &str, value: &serde_json::Value) -> Result<RecordId> {
        let body = serde_json::to_string(value)?;
        let result = sqlx::query(
            "INSERT INTO offline_store (collection, body, created_at) VALUES (?, ?, ?)",
        )
        .bind(collection)
        .bind(body)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn replace(&self, collection: &str, id: RecordId, value: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_string(value)?;
        let result = sqlx::query("UPDATE offline_store SET body = ? WHERE collection = ? AND id = ?")
            .bind(body)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::unavailable(format!("{} #{} not found", collection, id)));
        }
        Ok(())
    }

    pub async fn get_all(&self, collection: &str) -> Result<Vec<StoredRow>> {
        let rows = sqlx::query("SELECT id, body FROM offline_store WHERE collection = ? ORDER BY id ASC")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let body: String = row.try_get("body")?;
            match serde_json::from_str(&body) {
                Ok(value) => values.push(StoredRow { id, value }),
                Err(e) => tracing::warn!("Skipping malformed {} #{}: {}", collection, id, e),
            }
        }

        Ok(values)
    }

    pub async fn remove(&self, collection: &str, id: RecordId) -> Result<()> {
        sqlx::query("DELETE FROM offline_store WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self, collection: &str) -> Result<usize> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM offline_store WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 as usize)
    }
}
