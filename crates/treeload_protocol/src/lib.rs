//! Shared types for the treeload pipeline.
//!
//! Everything that crosses a crate boundary lives here: the run identifier,
//! the immutable records produced by discovery, and the [`Sink`] contract the
//! loader writes through.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Discovery   │────▶│ BatchLoader  │────▶│     Sink     │
//! │ (FileRecord) │     │  (batches)   │     │ (SQL, etc.)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

pub mod hashing;
pub mod ids;
pub mod paths;
pub mod records;
pub mod sink;

pub use hashing::content_hash;
pub use ids::{IdParseError, RunId};
pub use records::{DeploymentMetadata, DeploymentRecord, FileMetadata, FileRecord, RunContext};
pub use sink::{Sink, SinkError, SinkResult};
