//! One full run: deployment record, discovery, batched load.

use crate::cancel::CancellationToken;
use crate::classifier::ContentClassifier;
use crate::discovery::{DiscoveryStatsSnapshot, FileDiscoverer};
use crate::error::PipelineError;
use crate::loader::{BatchLoader, LoadProgress, LoadSummary, DEFAULT_BATCH_SIZE};
use serde::Serialize;
use std::path::Path;
use tracing::info;
use treeload_protocol::{RunContext, RunId, Sink};

/// Default content size cap: 100 MiB
pub const DEFAULT_MAX_CONTENT_SIZE: u64 = 100 * 1024 * 1024;

/// Tuning knobs for a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub max_content_size_bytes: u64,
    /// Records buffered between the walk and the loader (default: batch size)
    pub channel_capacity: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_content_size_bytes: DEFAULT_MAX_CONTENT_SIZE,
            channel_capacity: None,
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    /// Deployment rows written (0 or 1)
    pub deployment_records: u64,
    pub load: LoadSummary,
    pub discovery: DiscoveryStatsSnapshot,
}

/// Scan-and-load pipeline for a single root.
pub struct Pipeline {
    options: PipelineOptions,
    classifier: ContentClassifier,
    cancel: CancellationToken,
    loader: BatchLoader,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        let loader = BatchLoader::new(options.batch_size);
        Self {
            options,
            classifier: ContentClassifier::default(),
            cancel: CancellationToken::new(),
            loader,
        }
    }

    pub fn with_classifier(mut self, classifier: ContentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// One token drives both the walk and the loader.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, callback: impl Fn(LoadProgress) + Send + Sync + 'static) -> Self {
        self.loader = self.loader.with_progress(callback);
        self
    }

    /// Scan `root` and load every record into `sink`.
    ///
    /// Input is validated before anything is written. The deployment record
    /// (if the context carries one) is written first, then records stream from
    /// the walk into the loader.
    pub async fn run<S: Sink>(
        self,
        ctx: &RunContext,
        root: &Path,
        sink: &S,
    ) -> Result<RunSummary, PipelineError> {
        let loader = self.loader.with_cancellation(self.cancel.clone());
        loader.validate()?;

        let discovery = FileDiscoverer::new(self.classifier)
            .with_cancellation(self.cancel)
            .discover(&ctx.run_id, root, self.options.max_content_size_bytes)?;

        let deployment_records = match ctx.deployment_record() {
            Some(record) => sink
                .insert_deployment_record(&record)
                .await
                .map_err(PipelineError::Deployment)?,
            None => 0,
        };

        let stats = discovery.stats();
        let capacity = self
            .options
            .channel_capacity
            .unwrap_or(self.options.batch_size);
        let load = loader.load_all(discovery.into_stream(capacity), sink).await?;

        let summary = RunSummary {
            run_id: ctx.run_id.clone(),
            deployment_records,
            load,
            discovery: stats.snapshot(),
        };
        info!(
            run_id = %summary.run_id,
            persisted = summary.load.persisted,
            batches = summary.load.batches,
            unreadable = summary
                .discovery
                .files_yielded
                .saturating_sub(summary.discovery.files_readable),
            "Run complete"
        );
        Ok(summary)
    }
}
