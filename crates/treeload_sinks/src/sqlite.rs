//! SQLite implementation of [`Sink`].
//!
//! Each `insert_batch` call is one transaction. Rows go in as multi-row
//! `INSERT`s of [`CHUNK_SIZE`] rows; if any chunk fails the whole
//! transaction is rolled back before the error is returned.

use crate::error::{DbError, Result};
use crate::schema::{self, FILE_RECORD_COLUMNS};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, Transaction};
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use treeload_protocol::{DeploymentRecord, FileRecord, RunId, Sink, SinkResult};

/// Rows per multi-row INSERT. 13 columns x 100 rows stays well under
/// SQLite's bind parameter limit.
pub const CHUNK_SIZE: usize = 100;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct SqliteSink {
    pool: SqlitePool,
}

impl SqliteSink {
    /// Open (creating if needed) the database at `url`.
    ///
    /// Tables are not created here; call [`Sink::initialize_schema`].
    ///
    /// Accepts `sqlite:<path>`, `sqlite://<path>` and `sqlite::memory:`.
    /// Parent directories of a file database are created.
    pub async fn connect(url: &str) -> Result<Self> {
        if !url.starts_with("sqlite:") {
            return Err(DbError::InvalidUrl(format!(
                "{} (expected sqlite:<path> or sqlite::memory:)",
                url
            )));
        }
        let in_memory = is_memory_url(url);
        if let Some(path) = database_file(url) {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DbError::InvalidUrl(format!("{}: {}", url, e)))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let options = if in_memory {
            options
        } else {
            options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        // An in-memory database lives only as long as its connection.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = pool_options.connect_with(options).await?;

        info!(url, "Connected to SQLite database");
        Ok(Self { pool })
    }

    /// Private in-memory database with the schema in place (for testing).
    pub async fn in_memory() -> Result<Self> {
        let sink = Self::connect("sqlite::memory:").await?;
        schema::ensure_schema(&sink.pool).await?;
        Ok(sink)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Number of file records stored for a run.
    pub async fn count_records(&self, run_id: &RunId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_records WHERE run_id = ?")
            .bind(run_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// The stored deployment record for a run, if any.
    pub async fn deployment(&self, run_id: &RunId) -> Result<Option<DeploymentRecord>> {
        let row = sqlx::query(
            "SELECT tags, deployment, deployment_date FROM deployments WHERE run_id = ?",
        )
        .bind(run_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let date: String = row.try_get("deployment_date")?;
        let deployment_date = DateTime::parse_from_rfc3339(&date)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);

        Ok(Some(DeploymentRecord {
            run_id: run_id.clone(),
            tags: row.try_get("tags")?,
            deployment: row.try_get("deployment")?,
            deployment_date,
        }))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn insert_records(&self, records: &[FileRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for chunk in records.chunks(CHUNK_SIZE) {
            match insert_chunk(&mut tx, chunk).await {
                Ok(rows) => inserted += rows,
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(error = %rollback_err, "Rollback failed");
                    }
                    return Err(e);
                }
            }
        }
        tx.commit().await?;

        debug!(inserted, "Batch committed");
        Ok(inserted)
    }

    async fn insert_deployment(&self, record: &DeploymentRecord) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO deployments (run_id, tags, deployment, deployment_date, recorded_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.run_id.as_str())
        .bind(record.tags.as_deref())
        .bind(record.deployment.as_deref())
        .bind(rfc3339(record.deployment_date))
        .bind(rfc3339(Utc::now()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(run_id = %record.run_id, "Deployment record already exists; keeping the first");
        }
        Ok(result.rows_affected())
    }
}

impl Sink for SqliteSink {
    fn insert_batch(&self, records: &[FileRecord]) -> impl Future<Output = SinkResult<u64>> + Send {
        async move {
            self.insert_records(records)
                .await
                .map_err(|e| e.into_sink("insert_batch"))
        }
    }

    fn insert_deployment_record(
        &self,
        record: &DeploymentRecord,
    ) -> impl Future<Output = SinkResult<u64>> + Send {
        async move {
            self.insert_deployment(record)
                .await
                .map_err(|e| e.into_sink("insert_deployment_record"))
        }
    }

    fn initialize_schema(&self) -> impl Future<Output = SinkResult<()>> + Send {
        async move {
            schema::ensure_schema(&self.pool)
                .await
                .map_err(|e| e.into_sink("initialize_schema"))
        }
    }

    fn test_connection(&self) -> impl Future<Output = bool> + Send {
        async move {
            match sqlx::query("SELECT 1").execute(&self.pool).await {
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "Database connection check failed");
                    false
                }
            }
        }
    }
}

async fn insert_chunk(tx: &mut Transaction<'_, Sqlite>, chunk: &[FileRecord]) -> Result<u64> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("INSERT INTO file_records ({}) ", FILE_RECORD_COLUMNS));
    builder.push_values(chunk, |mut row, record| {
        row.push_bind(record.run_id().as_str())
            .push_bind(record.full_path())
            .push_bind(record.file_name())
            .push_bind(record.file_extension())
            .push_bind(record.directory_path())
            .push_bind(i64::try_from(record.file_size_bytes()).unwrap_or(i64::MAX))
            .push_bind(record.created_at().map(rfc3339))
            .push_bind(record.modified_at().map(rfc3339))
            .push_bind(record.accessed_at().map(rfc3339))
            .push_bind(record.content())
            .push_bind(record.content_hash())
            .push_bind(record.is_readable())
            .push_bind(record.error_message());
    });

    let result = builder.build().execute(&mut **tx).await?;
    Ok(result.rows_affected())
}

fn rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Filesystem path of a file-backed SQLite URL.
fn database_file(url: &str) -> Option<PathBuf> {
    if is_memory_url(url) {
        return None;
    }
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}
