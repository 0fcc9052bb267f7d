//! Treeload Scout - file discovery and batched loading
//!
//! Walks a directory tree lazily, turns every regular file into a
//! [`treeload_protocol::FileRecord`], and loads those records into a
//! [`treeload_protocol::Sink`] in bounded, independently committed batches.
//!
//! # Architecture
//!
//! ```text
//! FileDiscoverer ──discover──► Discovery (Iterator, blocking walk)
//!                                  │ into_stream (bounded channel)
//!                                  ▼
//!                            BatchLoader ──insert_batch──► Sink
//! ```
//!
//! [`Pipeline`] wires the pieces together for one run and writes the
//! deployment record before loading starts.

pub mod cancel;
pub mod classifier;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod pipeline;

pub use cancel::CancellationToken;
pub use classifier::{ContentClassifier, ContentDecision, SkipReason, DEFAULT_BINARY_EXTENSIONS};
pub use discovery::{Discovery, DiscoveryStats, DiscoveryStatsSnapshot, FileDiscoverer};
pub use error::{LoadError, PipelineError, ScanError};
pub use loader::{BatchLoader, LoadProgress, LoadSummary, ProgressCallback, DEFAULT_BATCH_SIZE};
pub use pipeline::{Pipeline, PipelineOptions, RunSummary, DEFAULT_MAX_CONTENT_SIZE};
