//! Error types for the database layer.

use thiserror::Error;
use treeload_protocol::SinkError;

/// Database operation result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection, query, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error (creating the database directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),
}

impl DbError {
    /// Wrap for the `Sink` boundary, naming the operation that failed.
    pub fn into_sink(self, operation: &'static str) -> SinkError {
        SinkError::backend(operation, self)
    }
}
