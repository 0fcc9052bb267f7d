//! Error types for discovery and loading

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use treeload_protocol::SinkError;

/// Errors raised by discovery.
///
/// Per-file problems never show up here; they are recorded on the
/// `FileRecord` itself.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Discovery cancelled")]
    Cancelled,

    /// The producer stopped without finishing the walk (e.g. it panicked)
    #[error("Discovery interrupted: {0}")]
    Interrupted(String),
}

/// Errors raised by [`crate::BatchLoader::load_all`].
///
/// Every variant raised after loading started carries `persisted`: the number
/// of records committed by earlier batches.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Batch {batch} failed after {persisted} records were persisted: {source}")]
    Sink {
        persisted: u64,
        /// 1-based index of the batch that failed
        batch: u64,
        #[source]
        source: SinkError,
    },

    #[error("Load cancelled after {persisted} records were persisted")]
    Cancelled { persisted: u64 },

    #[error("Discovery failed after {persisted} records were persisted: {source}")]
    Discovery {
        persisted: u64,
        #[source]
        source: ScanError,
    },
}

impl LoadError {
    /// Records committed before the failure.
    pub fn persisted(&self) -> u64 {
        match self {
            LoadError::Validation(_) => 0,
            LoadError::Sink { persisted, .. }
            | LoadError::Cancelled { persisted }
            | LoadError::Discovery { persisted, .. } => *persisted,
        }
    }
}

/// Errors from a full scan-and-load run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Failed to write deployment record: {0}")]
    Deployment(#[source] SinkError),
}

impl PipelineError {
    /// Records committed before the failure.
    pub fn persisted(&self) -> u64 {
        match self {
            PipelineError::Load(err) => err.persisted(),
            PipelineError::Scan(_) | PipelineError::Deployment(_) => 0,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            PipelineError::Scan(ScanError::Cancelled) | PipelineError::Load(LoadError::Cancelled { .. })
        )
    }

    /// Bad input detected before any work started.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PipelineError::Scan(ScanError::Validation(_))
                | PipelineError::Scan(ScanError::NotFound(_))
                | PipelineError::Load(LoadError::Validation(_))
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_persisted() {
        let err = LoadError::Sink {
            persisted: 1000,
            batch: 3,
            source: SinkError::rejected("boom"),
        };
        assert_eq!(err.persisted(), 1000);
        assert!(err.to_string().contains("Batch 3"));
        assert_eq!(LoadError::Validation("x".into()).persisted(), 0);
    }

    #[test]
    fn test_pipeline_error_classification() {
        let cancelled = PipelineError::from(LoadError::Cancelled { persisted: 5 });
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.persisted(), 5);

        let missing = PipelineError::from(ScanError::NotFound(PathBuf::from("/nope")));
        assert!(missing.is_validation());
        assert!(!missing.is_cancelled());
        assert_eq!(missing.to_string(), "Path not found: /nope");
    }
}
