//! Batch accounting, failure propagation and cancellation in the loader.

mod common;

use common::{sample_records, write_text_files, MemorySink};
use futures::{stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use treeload_protocol::{FileRecord, RunId};
use treeload_scout::{
    BatchLoader, CancellationToken, FileDiscoverer, LoadError, LoadProgress, ScanError,
};

fn ok_stream(records: Vec<FileRecord>) -> impl futures::Stream<Item = Result<FileRecord, ScanError>> {
    stream::iter(records.into_iter().map(Ok))
}

#[tokio::test]
async fn test_flush_count_is_ceil_n_over_b() {
    let run_id = RunId::new();
    for (n, b, expected) in [(12, 5, vec![5, 5, 2]), (10, 5, vec![5, 5]), (3, 10, vec![3]), (1, 1, vec![1])] {
        let sink = MemorySink::new();
        let summary = BatchLoader::new(b)
            .load_all(ok_stream(sample_records(&run_id, n)), &sink)
            .await
            .unwrap();

        assert_eq!(sink.batch_sizes(), expected, "n={} b={}", n, b);
        assert_eq!(summary.batches, expected.len() as u64);
        assert_eq!(summary.persisted, n as u64);
    }
}

#[tokio::test]
async fn test_empty_input_never_flushes() {
    let sink = MemorySink::new();
    let summary = BatchLoader::new(10)
        .load_all(ok_stream(Vec::new()), &sink)
        .await
        .unwrap();

    assert_eq!(sink.calls(), 0);
    assert_eq!(summary.persisted, 0);
    assert_eq!(summary.batches, 0);
}

#[tokio::test]
async fn test_failure_reports_prior_progress() {
    let run_id = RunId::new();
    let sink = MemorySink::fail_on_batch(3);

    let err = BatchLoader::new(5)
        .load_all(ok_stream(sample_records(&run_id, 23)), &sink)
        .await
        .unwrap_err();

    match err {
        LoadError::Sink {
            persisted, batch, ..
        } => {
            assert_eq!(persisted, 10);
            assert_eq!(batch, 3);
        }
        other => panic!("expected sink error, got {:?}", other),
    }
    // Nothing after the failed batch is attempted.
    assert_eq!(sink.calls(), 3);
    assert_eq!(sink.records().len(), 10);
}

#[tokio::test]
async fn test_failure_on_first_batch_reports_zero() {
    let sink = MemorySink::fail_on_batch(1);
    let err = BatchLoader::new(4)
        .load_all(ok_stream(sample_records(&RunId::new(), 3)), &sink)
        .await
        .unwrap_err();
    assert_eq!(err.persisted(), 0);
}

#[tokio::test]
async fn test_zero_batch_size_fails_before_reading() {
    let sink = MemorySink::new();
    let polled = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&polled);
    let records = stream::iter(sample_records(&RunId::new(), 3)).map(move |r| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, ScanError>(r)
    });

    let err = BatchLoader::new(0).load_all(records, &sink).await.unwrap_err();
    assert!(matches!(err, LoadError::Validation(_)));
    assert_eq!(polled.load(Ordering::SeqCst), 0);
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn test_progress_reported_after_each_flush() {
    let seen: Arc<Mutex<Vec<LoadProgress>>> = Arc::default();
    let sink_seen = Arc::clone(&seen);
    let sink = MemorySink::new();

    BatchLoader::new(4)
        .with_progress(move |p| sink_seen.lock().unwrap().push(p))
        .load_all(ok_stream(sample_records(&RunId::new(), 10)), &sink)
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let persisted: Vec<u64> = seen.iter().map(|p| p.persisted).collect();
    assert_eq!(persisted, vec![4, 8, 10]);
    assert_eq!(seen.last().unwrap().batches, 3);
}

#[tokio::test]
async fn test_panicking_progress_callback_does_not_abort() {
    let sink = MemorySink::new();
    let summary = BatchLoader::new(2)
        .with_progress(|_| panic!("progress renderer exploded"))
        .load_all(ok_stream(sample_records(&RunId::new(), 5)), &sink)
        .await
        .unwrap();

    assert_eq!(summary.persisted, 5);
    assert_eq!(sink.batch_sizes(), vec![2, 2, 1]);
}

#[tokio::test]
async fn test_discovery_error_carries_progress() {
    let run_id = RunId::new();
    let mut items: Vec<Result<FileRecord, ScanError>> =
        sample_records(&run_id, 3).into_iter().map(Ok).collect();
    items.push(Err(ScanError::Interrupted("walker died".into())));

    let sink = MemorySink::new();
    let err = BatchLoader::new(2)
        .load_all(stream::iter(items), &sink)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LoadError::Discovery {
            persisted: 2,
            source: ScanError::Interrupted(_)
        }
    ));
    // The partial trailing batch is dropped, not flushed.
    assert_eq!(sink.batch_sizes(), vec![2]);
}

#[tokio::test]
async fn test_cancel_during_load_stops_discovery() {
    let tmp = TempDir::new().unwrap();
    write_text_files(tmp.path(), 20);

    let cancel = CancellationToken::new();
    let discovery = FileDiscoverer::default()
        .with_cancellation(cancel.clone())
        .discover(&RunId::new(), tmp.path(), 1024)
        .unwrap();

    let trip = cancel.clone();
    let sink = MemorySink::new();
    let err = BatchLoader::new(5)
        .with_cancellation(cancel)
        .with_progress(move |_| trip.cancel())
        .load_all(stream::iter(discovery), &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::Cancelled { persisted: 5 }));
    assert_eq!(sink.records().len(), 5);
}

#[tokio::test]
async fn test_cancel_before_flush_skips_the_write() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = MemorySink::new();

    let err = BatchLoader::new(2)
        .with_cancellation(cancel)
        .load_all(ok_stream(sample_records(&RunId::new(), 4)), &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, LoadError::Cancelled { persisted: 0 }));
    assert_eq!(sink.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_streamed_discovery_loads_every_file() {
    let tmp = TempDir::new().unwrap();
    write_text_files(tmp.path(), 37);

    let discovery = FileDiscoverer::default()
        .discover(&RunId::new(), tmp.path(), 1024)
        .unwrap();
    let stats = discovery.stats();

    let sink = MemorySink::new();
    let summary = BatchLoader::new(10)
        .load_all(discovery.into_stream(4), &sink)
        .await
        .unwrap();

    assert_eq!(summary.persisted, 37);
    assert_eq!(sink.batch_sizes(), vec![10, 10, 10, 7]);
    assert_eq!(stats.snapshot().files_readable, 37);
}
