//! SQLite schema and migrations for the structured backend.

use sqlx::SqlitePool;

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Base schema, applied idempotently on every open
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Versions newer than `current_version`, in application order
pub fn pending_migrations(current_version: i32) -> impl Iterator<Item = i32> {
    (current_version + 1)..=CURRENT_SCHEMA_VERSION
}

/// Create tables and record any migrations not yet applied
pub async fn apply(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    let current_version: (i32,) =
        sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(pool)
            .await?;

    for version in pending_migrations(current_version.0) {
        // Version 1 is the base schema; later versions add their DDL here
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(pool)
            .await?;
        tracing::debug!("Applied local store migration {}", version);
    }

    Ok(())
}
