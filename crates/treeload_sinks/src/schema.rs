//! Table definitions. All CREATE statements live here.

use crate::error::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Columns written for each file record, in bind order.
pub(crate) const FILE_RECORD_COLUMNS: &str = "run_id, full_path, file_name, file_extension, \
     directory_path, file_size_bytes, created_at, modified_at, accessed_at, content, \
     content_hash, is_readable, error_message";

/// Create tables and indexes if they do not exist.
pub(crate) async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    // One row per discovered file. Duplicate paths within a run are kept.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS file_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL,
            full_path TEXT NOT NULL CHECK (full_path <> ''),
            file_name TEXT NOT NULL,
            file_extension TEXT NOT NULL,
            directory_path TEXT NOT NULL,
            file_size_bytes INTEGER NOT NULL,
            created_at TEXT,
            modified_at TEXT,
            accessed_at TEXT,
            content TEXT,
            content_hash TEXT,
            is_readable INTEGER NOT NULL,
            error_message TEXT,
            CHECK ((content IS NULL) = (content_hash IS NULL))
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_file_records_run_id ON file_records(run_id)")
        .execute(pool)
        .await?;

    // One row per run
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS deployments (
            run_id TEXT PRIMARY KEY,
            tags TEXT,
            deployment TEXT,
            deployment_date TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    info!("Database schema verified");
    Ok(())
}
