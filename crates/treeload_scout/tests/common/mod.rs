#![allow(dead_code)]

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use treeload_protocol::{
    DeploymentRecord, FileMetadata, FileRecord, RunId, Sink, SinkError, SinkResult,
};

/// In-memory sink that records every committed batch.
///
/// `fail_on_batch(k)` makes the k-th `insert_batch` call (1-based) fail
/// without committing anything.
#[derive(Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<FileRecord>>>,
    deployments: Mutex<Vec<DeploymentRecord>>,
    calls: AtomicUsize,
    fail_on: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_batch(batch: usize) -> Self {
        Self {
            fail_on: Some(batch),
            ..Self::default()
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn records(&self) -> Vec<FileRecord> {
        self.batches.lock().unwrap().iter().flatten().cloned().collect()
    }

    pub fn deployments(&self) -> Vec<DeploymentRecord> {
        self.deployments.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Sink for MemorySink {
    fn insert_batch(&self, records: &[FileRecord]) -> impl Future<Output = SinkResult<u64>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let result = if self.fail_on == Some(call) {
            Err(SinkError::rejected(format!("injected failure on batch {}", call)))
        } else {
            self.batches.lock().unwrap().push(records.to_vec());
            Ok(records.len() as u64)
        };
        async move { result }
    }

    fn insert_deployment_record(
        &self,
        record: &DeploymentRecord,
    ) -> impl Future<Output = SinkResult<u64>> + Send {
        self.deployments.lock().unwrap().push(record.clone());
        async { Ok(1) }
    }

    fn initialize_schema(&self) -> impl Future<Output = SinkResult<()>> + Send {
        async { Ok(()) }
    }

    fn test_connection(&self) -> impl Future<Output = bool> + Send {
        async { true }
    }
}

/// `count` readable records with distinct paths.
pub fn sample_records(run_id: &RunId, count: usize) -> Vec<FileRecord> {
    (0..count)
        .map(|i| {
            let path = format!("/data/file_{}.txt", i);
            FileRecord::readable(
                run_id.clone(),
                FileMetadata::from_path(Path::new(&path)),
                format!("content {}", i),
            )
        })
        .collect()
}

/// Write `count` small text files into `dir`.
pub fn write_text_files(dir: &Path, count: usize) {
    for i in 0..count {
        std::fs::write(dir.join(format!("file_{:03}.txt", i)), format!("line {}\n", i)).unwrap();
    }
}
