//! Lazy recursive file discovery.
//!
//! # Design
//!
//! - Walk the tree with `walkdir`, one entry at a time; nothing is collected
//! - Every regular file becomes exactly one [`FileRecord`]. Failures on a
//!   single file degrade to an unreadable record, they never end the walk
//! - Inaccessible directories are skipped at the traversal layer
//! - Symlinked directories are not followed and symlinks are not reported
//! - The cancellation token is checked before every entry; once it trips the
//!   sequence yields [`ScanError::Cancelled`] and then ends

use crate::cancel::CancellationToken;
use crate::classifier::{ContentClassifier, ContentDecision, SkipReason};
use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};
use treeload_protocol::records::extension_with_dot;
use treeload_protocol::{FileMetadata, FileRecord, RunId};
use walkdir::WalkDir;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Builds [`Discovery`] sequences for a root path.
#[derive(Debug, Clone, Default)]
pub struct FileDiscoverer {
    classifier: Arc<ContentClassifier>,
    cancel: CancellationToken,
}

impl FileDiscoverer {
    pub fn new(classifier: ContentClassifier) -> Self {
        Self {
            classifier: Arc::new(classifier),
            cancel: CancellationToken::new(),
        }
    }

    /// Share a cancellation token with the discovery sequences this creates.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Validate the root and return a lazy sequence of records beneath it.
    ///
    /// Fails before producing anything if the root is blank, missing or not a
    /// directory, or if `max_content_size_bytes` is zero.
    pub fn discover(
        &self,
        run_id: &RunId,
        root: impl AsRef<Path>,
        max_content_size_bytes: u64,
    ) -> Result<Discovery> {
        let root = root.as_ref();
        if root.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(ScanError::Validation("Root path must not be empty".into()));
        }
        if max_content_size_bytes == 0 {
            return Err(ScanError::Validation(
                "Max content size must be greater than zero".into(),
            ));
        }

        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };

        let meta = match fs::metadata(&root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScanError::NotFound(root));
            }
            Err(e) => return Err(ScanError::Io(e)),
        };
        if !meta.is_dir() {
            return Err(ScanError::Validation(format!(
                "Root path is not a directory: {}",
                root.display()
            )));
        }

        info!(run_id = %run_id, root = %root.display(), "Starting discovery");

        Ok(Discovery {
            run_id: run_id.clone(),
            walker: WalkDir::new(&root).follow_links(false).into_iter(),
            root,
            classifier: Arc::clone(&self.classifier),
            max_content_size_bytes,
            cancel: self.cancel.clone(),
            stats: Arc::new(DiscoveryStats::default()),
            finished: false,
        })
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Live discovery counters. Shared via `Arc` so they stay readable after the
/// sequence moves onto a producer thread.
#[derive(Debug, Default)]
pub struct DiscoveryStats {
    files_yielded: AtomicU64,
    files_readable: AtomicU64,
    files_skipped_binary: AtomicU64,
    files_skipped_large: AtomicU64,
    files_failed: AtomicU64,
    entries_skipped: AtomicU64,
    bytes_read: AtomicU64,
}

/// Point-in-time copy of [`DiscoveryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStatsSnapshot {
    pub files_yielded: u64,
    pub files_readable: u64,
    pub files_skipped_binary: u64,
    pub files_skipped_large: u64,
    /// Metadata or content read failures
    pub files_failed: u64,
    /// Traversal entries that could not be accessed
    pub entries_skipped: u64,
    pub bytes_read: u64,
}

impl DiscoveryStats {
    pub fn snapshot(&self) -> DiscoveryStatsSnapshot {
        DiscoveryStatsSnapshot {
            files_yielded: self.files_yielded.load(Ordering::Relaxed),
            files_readable: self.files_readable.load(Ordering::Relaxed),
            files_skipped_binary: self.files_skipped_binary.load(Ordering::Relaxed),
            files_skipped_large: self.files_skipped_large.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            entries_skipped: self.entries_skipped.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// Discovery sequence
// ============================================================================

/// Lazy, finite sequence of [`FileRecord`]s under one root.
pub struct Discovery {
    run_id: RunId,
    root: PathBuf,
    walker: walkdir::IntoIter,
    classifier: Arc<ContentClassifier>,
    max_content_size_bytes: u64,
    cancel: CancellationToken,
    stats: Arc<DiscoveryStats>,
    finished: bool,
}

impl Discovery {
    pub fn stats(&self) -> Arc<DiscoveryStats> {
        Arc::clone(&self.stats)
    }

    /// Run the walk on a blocking thread, feeding a bounded channel.
    ///
    /// At most `capacity` records are buffered; the walk blocks when the
    /// consumer falls behind and stops when the consumer goes away. Must be
    /// called from within a Tokio runtime.
    pub fn into_stream(
        self,
        capacity: usize,
    ) -> impl Stream<Item = std::result::Result<FileRecord, ScanError>> + Send + 'static {
        let (tx, rx) = tokio::sync::mpsc::channel(capacity.max(1));

        let handle = tokio::task::spawn_blocking(move || {
            for item in self {
                if tx.blocking_send(item).is_err() {
                    debug!("Record consumer dropped; stopping discovery");
                    break;
                }
            }
        });

        futures::stream::unfold((rx, Some(handle)), |(mut rx, handle)| async move {
            if let Some(item) = rx.recv().await {
                return Some((item, (rx, handle)));
            }
            // Channel drained: surface a producer panic instead of ending quietly.
            match handle?.await {
                Ok(()) => None,
                Err(join_err) => Some((
                    Err(ScanError::Interrupted(join_err.to_string())),
                    (rx, None),
                )),
            }
        })
    }

    fn build_record(&self, path: &Path, entry: &walkdir::DirEntry) -> FileRecord {
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                DiscoveryStats::bump(&self.stats.files_failed);
                debug!(path = %path.display(), error = %e, "Failed to read metadata");
                return FileRecord::unreadable(
                    self.run_id.clone(),
                    FileMetadata::from_path(path),
                    format!("Failed to read metadata: {}", e),
                );
            }
        };

        let file_meta = FileMetadata {
            full_path: path.to_string_lossy().into_owned(),
            file_name: entry.file_name().to_string_lossy().into_owned(),
            file_extension: extension_with_dot(path),
            directory_path: path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_size_bytes: metadata.len(),
            created_at: metadata.created().ok().and_then(to_utc),
            modified_at: metadata.modified().ok().and_then(to_utc),
            accessed_at: metadata.accessed().ok().and_then(to_utc),
        };

        match self.classifier.classify(
            &file_meta.file_extension,
            file_meta.file_size_bytes,
            self.max_content_size_bytes,
        ) {
            ContentDecision::Skip(reason) => {
                match reason {
                    SkipReason::Binary => DiscoveryStats::bump(&self.stats.files_skipped_binary),
                    SkipReason::TooLarge => DiscoveryStats::bump(&self.stats.files_skipped_large),
                }
                FileRecord::unreadable(self.run_id.clone(), file_meta, reason.message())
            }
            ContentDecision::Read => match read_text(path, self.max_content_size_bytes) {
                Ok(content) => {
                    DiscoveryStats::bump(&self.stats.files_readable);
                    self.stats
                        .bytes_read
                        .fetch_add(content.len() as u64, Ordering::Relaxed);
                    FileRecord::readable(self.run_id.clone(), file_meta, content)
                }
                Err(reason) => {
                    DiscoveryStats::bump(&self.stats.files_failed);
                    debug!(path = %path.display(), reason = %reason, "Content not read");
                    FileRecord::unreadable(self.run_id.clone(), file_meta, reason)
                }
            },
        }
    }
}

impl Iterator for Discovery {
    type Item = std::result::Result<FileRecord, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self.cancel.is_cancelled() {
                self.finished = true;
                info!(
                    run_id = %self.run_id,
                    yielded = self.stats.files_yielded.load(Ordering::Relaxed),
                    "Discovery cancelled"
                );
                return Some(Err(ScanError::Cancelled));
            }

            let entry = match self.walker.next() {
                None => {
                    self.finished = true;
                    let stats = self.stats.snapshot();
                    info!(
                        run_id = %self.run_id,
                        root = %self.root.display(),
                        files = stats.files_yielded,
                        readable = stats.files_readable,
                        skipped_entries = stats.entries_skipped,
                        "Discovery complete"
                    );
                    return None;
                }
                Some(Err(e)) => {
                    DiscoveryStats::bump(&self.stats.entries_skipped);
                    debug!(
                        path = ?e.path(),
                        error = %e,
                        "Skipping inaccessible entry"
                    );
                    continue;
                }
                Some(Ok(entry)) => entry,
            };

            // Directories are walked into; symlinks and special files are not records.
            if !entry.file_type().is_file() {
                continue;
            }

            let record = self.build_record(entry.path(), &entry);
            DiscoveryStats::bump(&self.stats.files_yielded);
            return Some(Ok(record));
        }
    }
}

/// Read a file as UTF-8 text, refusing to buffer `limit` bytes or more.
///
/// The size was checked before calling, but the file may have grown since.
fn read_text(path: &Path, limit: u64) -> std::result::Result<String, String> {
    let file = File::open(path).map_err(|e| format!("Failed to read content: {}", e))?;
    let mut bytes = Vec::new();
    file.take(limit)
        .read_to_end(&mut bytes)
        .map_err(|e| format!("Failed to read content: {}", e))?;
    if bytes.len() as u64 >= limit {
        return Err(SkipReason::TooLarge.message().to_string());
    }

    if bytes.starts_with(UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    String::from_utf8(bytes).map_err(|_| "Content is not valid UTF-8".to_string())
}

fn to_utc(time: SystemTime) -> Option<DateTime<Utc>> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => DateTime::from_timestamp(d.as_secs() as i64, d.subsec_nanos()),
        Err(e) => {
            let d = e.duration();
            let (secs, nanos) = if d.subsec_nanos() == 0 {
                (-(d.as_secs() as i64), 0)
            } else {
                (-(d.as_secs() as i64) - 1, 1_000_000_000 - d.subsec_nanos())
            };
            DateTime::from_timestamp(secs, nanos)
        }
    }
}
