//! Bounded-memory batch loader.
//!
//! Pulls records one at a time, keeps at most `batch_size` of them in memory,
//! and hands each full batch to the sink in a single call. The sink owns the
//! transaction; the loader owns the accounting.

use crate::cancel::CancellationToken;
use crate::error::{LoadError, ScanError};
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, info, warn};
use treeload_protocol::{FileRecord, Sink};

/// Default number of records per flush
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Cumulative progress, reported after each successful flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadProgress {
    /// Batches committed so far
    pub batches: u64,
    /// Records committed so far
    pub persisted: u64,
}

/// Outcome of a completed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub batches: u64,
    pub persisted: u64,
    pub duration_ms: u64,
}

pub type ProgressCallback = Box<dyn Fn(LoadProgress) + Send + Sync>;

pub struct BatchLoader {
    batch_size: usize,
    cancel: CancellationToken,
    progress: Option<ProgressCallback>,
}

impl Default for BatchLoader {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Share a cancellation token; it is checked before every flush.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Called after each successful flush. A panicking callback is logged and
    /// ignored; it never aborts the load.
    pub fn with_progress(mut self, callback: impl Fn(LoadProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Check the configuration without touching any input.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.batch_size == 0 {
            return Err(LoadError::Validation(
                "Batch size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Consume `records`, flushing every `batch_size` records and once more
    /// for any trailing partial batch.
    ///
    /// On failure the error carries the number of records committed by the
    /// batches that succeeded before it. Nothing is retried.
    pub async fn load_all<St, S>(&self, records: St, sink: &S) -> Result<LoadSummary, LoadError>
    where
        St: Stream<Item = Result<FileRecord, ScanError>>,
        S: Sink,
    {
        self.validate()?;

        let start = Instant::now();
        let mut records = std::pin::pin!(records);
        let mut batch: Vec<FileRecord> = Vec::with_capacity(self.batch_size);
        let mut progress = LoadProgress::default();

        while let Some(item) = records.next().await {
            match item {
                Ok(record) => {
                    batch.push(record);
                    if batch.len() >= self.batch_size {
                        self.flush(&mut batch, sink, &mut progress).await?;
                    }
                }
                Err(ScanError::Cancelled) => {
                    info!(persisted = progress.persisted, "Discovery cancelled; dropping partial batch");
                    return Err(LoadError::Cancelled {
                        persisted: progress.persisted,
                    });
                }
                Err(source) => {
                    return Err(LoadError::Discovery {
                        persisted: progress.persisted,
                        source,
                    });
                }
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, sink, &mut progress).await?;
        }

        let summary = LoadSummary {
            batches: progress.batches,
            persisted: progress.persisted,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            batches = summary.batches,
            persisted = summary.persisted,
            duration_ms = summary.duration_ms,
            "Load complete"
        );
        Ok(summary)
    }

    async fn flush<S: Sink>(
        &self,
        batch: &mut Vec<FileRecord>,
        sink: &S,
        progress: &mut LoadProgress,
    ) -> Result<(), LoadError> {
        if self.cancel.is_cancelled() {
            return Err(LoadError::Cancelled {
                persisted: progress.persisted,
            });
        }

        let batch_no = progress.batches + 1;
        let inserted = sink.insert_batch(batch.as_slice()).await.map_err(|source| {
            warn!(
                batch = batch_no,
                size = batch.len(),
                persisted = progress.persisted,
                error = %source,
                "Batch flush failed"
            );
            LoadError::Sink {
                persisted: progress.persisted,
                batch: batch_no,
                source,
            }
        })?;

        progress.batches = batch_no;
        progress.persisted += inserted;
        debug!(batch = batch_no, inserted, persisted = progress.persisted, "Batch flushed");
        batch.clear();

        self.report(*progress);
        Ok(())
    }

    fn report(&self, progress: LoadProgress) {
        if let Some(callback) = &self.progress {
            if catch_unwind(AssertUnwindSafe(|| callback(progress))).is_err() {
                warn!(
                    persisted = progress.persisted,
                    "Progress callback panicked; continuing load"
                );
            }
        }
    }
}
