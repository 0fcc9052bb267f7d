//! The persistence boundary.
//!
//! The loader only ever talks to storage through [`Sink`]. Each call to
//! [`Sink::insert_batch`] must be atomic: either every record in the slice is
//! committed or none are.

use crate::records::{DeploymentRecord, FileRecord};
use std::future::Future;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The storage backend failed (connection, query, commit, ...)
    #[error("{operation} failed: {source}")]
    Backend {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// The sink refused the input without touching storage
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl SinkError {
    pub fn backend(operation: &'static str, source: impl Into<BoxError>) -> Self {
        SinkError::Backend {
            operation,
            source: source.into(),
        }
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        SinkError::Rejected(msg.into())
    }
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Storage that accepts batches of file records and deployment records.
pub trait Sink: Send + Sync {
    /// Insert all records in one transaction and return the number inserted.
    ///
    /// On error nothing from this batch may remain committed.
    fn insert_batch(&self, records: &[FileRecord]) -> impl Future<Output = SinkResult<u64>> + Send;

    /// Insert the run's deployment record. Returns 0 or 1.
    fn insert_deployment_record(
        &self,
        record: &DeploymentRecord,
    ) -> impl Future<Output = SinkResult<u64>> + Send;

    /// Create tables if they do not exist.
    fn initialize_schema(&self) -> impl Future<Output = SinkResult<()>> + Send;

    /// Cheap liveness probe.
    fn test_connection(&self) -> impl Future<Output = bool> + Send;
}
