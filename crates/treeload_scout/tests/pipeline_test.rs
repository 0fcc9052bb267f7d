mod common;

use chrono::{TimeZone, Utc};
use common::{write_text_files, MemorySink};
use std::fs;
use tempfile::TempDir;
use treeload_protocol::{DeploymentMetadata, RunContext, RunId};
use treeload_scout::{CancellationToken, Pipeline, PipelineOptions};

fn options(batch_size: usize) -> PipelineOptions {
    PipelineOptions {
        batch_size,
        ..PipelineOptions::default()
    }
}

#[tokio::test]
async fn test_run_writes_deployment_then_records() {
    let tmp = TempDir::new().unwrap();
    write_text_files(tmp.path(), 7);
    fs::write(tmp.path().join("logo.png"), "binary-ish").unwrap();

    let date = Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap();
    let ctx = RunContext::new(RunId::new()).with_deployment(DeploymentMetadata::new(
        Some("nightly".into()),
        Some("build-42".into()),
        Some(date),
    ));
    let sink = MemorySink::new();

    let summary = Pipeline::new(options(3))
        .run(&ctx, tmp.path(), &sink)
        .await
        .unwrap();

    assert_eq!(summary.run_id, ctx.run_id);
    assert_eq!(summary.deployment_records, 1);
    assert_eq!(summary.load.persisted, 8);
    assert_eq!(summary.load.batches, 3);
    assert_eq!(summary.discovery.files_skipped_binary, 1);

    let deployments = sink.deployments();
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].run_id, ctx.run_id);
    assert_eq!(deployments[0].deployment.as_deref(), Some("build-42"));
    assert_eq!(deployments[0].deployment_date, date);

    assert!(sink.records().iter().all(|r| r.run_id() == &ctx.run_id));
}

#[tokio::test]
async fn test_run_without_deployment_metadata() {
    let tmp = TempDir::new().unwrap();
    write_text_files(tmp.path(), 2);
    let sink = MemorySink::new();

    let summary = Pipeline::new(PipelineOptions::default())
        .run(&RunContext::new(RunId::new()), tmp.path(), &sink)
        .await
        .unwrap();

    assert_eq!(summary.deployment_records, 0);
    assert!(sink.deployments().is_empty());
    assert_eq!(summary.load.persisted, 2);
}

#[tokio::test]
async fn test_validation_happens_before_any_write() {
    let tmp = TempDir::new().unwrap();
    let ctx = RunContext::new(RunId::new())
        .with_deployment(DeploymentMetadata::new(None, Some("v1".into()), None));

    let sink = MemorySink::new();
    let missing = Pipeline::new(PipelineOptions::default())
        .run(&ctx, &tmp.path().join("nope"), &sink)
        .await
        .unwrap_err();
    assert!(missing.is_validation());

    let zero_batch = Pipeline::new(options(0))
        .run(&ctx, tmp.path(), &sink)
        .await
        .unwrap_err();
    assert!(zero_batch.is_validation());

    let zero_limit = Pipeline::new(PipelineOptions {
        max_content_size_bytes: 0,
        ..PipelineOptions::default()
    })
    .run(&ctx, tmp.path(), &sink)
    .await
    .unwrap_err();
    assert!(zero_limit.is_validation());

    assert!(sink.deployments().is_empty());
    assert_eq!(sink.calls(), 0);
}

#[tokio::test]
async fn test_sink_failure_surfaces_partial_count() {
    let tmp = TempDir::new().unwrap();
    write_text_files(tmp.path(), 9);
    let sink = MemorySink::fail_on_batch(2);

    let err = Pipeline::new(options(4))
        .run(&RunContext::new(RunId::new()), tmp.path(), &sink)
        .await
        .unwrap_err();

    assert!(!err.is_cancelled());
    assert_eq!(err.persisted(), 4);
}

#[tokio::test]
async fn test_pre_cancelled_run_is_reported_as_cancelled() {
    let tmp = TempDir::new().unwrap();
    write_text_files(tmp.path(), 3);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = MemorySink::new();

    let err = Pipeline::new(PipelineOptions::default())
        .with_cancellation(cancel)
        .run(&RunContext::new(RunId::new()), tmp.path(), &sink)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.persisted(), 0);
    assert_eq!(sink.calls(), 0);
}
