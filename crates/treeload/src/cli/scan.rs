//! `treeload scan`: discover a tree and load it into the database.

use crate::cli::config::{ScanInputs, ScanSettings};
use crate::cli::error::HelpfulError;
use crate::cli::output::ScanReport;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{info, warn};
use treeload_protocol::Sink;
use treeload_scout::{CancellationToken, LoadProgress, Pipeline, RunSummary};
use treeload_sinks::SqliteSink;

/// Arguments for the scan command
#[derive(Debug)]
pub struct ScanArgs {
    pub inputs: ScanInputs,
    pub no_progress: bool,
    pub json: bool,
}

pub async fn run(args: ScanArgs) -> Result<()> {
    let settings = args.inputs.resolve()?;
    let sink = open_sink(&settings.database_url).await?;

    let cancel = CancellationToken::new();
    let interrupt = spawn_interrupt_handler(cancel.clone());

    let progress = if args.no_progress || args.json {
        ProgressBar::hidden()
    } else {
        spinner()
    };

    let result = execute(&settings, &sink, cancel, progress.clone()).await;
    interrupt.abort();
    progress.finish_and_clear();
    sink.close().await;

    let summary = result.with_context(|| format!("Scan of {} failed", settings.root.display()))?;
    ScanReport::completed(settings.root.clone(), settings.database_url.clone(), summary).print(args.json)
}

/// Run the pipeline against an open sink.
pub async fn execute<S: Sink>(
    settings: &ScanSettings,
    sink: &S,
    cancel: CancellationToken,
    progress: ProgressBar,
) -> Result<RunSummary> {
    sink.initialize_schema()
        .await
        .context("Failed to initialize database schema")?;

    info!(
        run_id = %settings.context.run_id,
        root = %settings.root.display(),
        batch_size = settings.options.batch_size,
        max_content_size = settings.options.max_content_size_bytes,
        "Starting scan"
    );

    let pipeline = Pipeline::new(settings.options.clone())
        .with_classifier(settings.classifier())
        .with_cancellation(cancel)
        .with_progress(move |p: LoadProgress| {
            progress.set_message(format!("{} records persisted ({} batches)", p.persisted, p.batches));
        });

    match pipeline.run(&settings.context, &settings.root, sink).await {
        Ok(summary) => Ok(summary),
        Err(err) if err.is_validation() => Err(HelpfulError::from_validation(&err).into()),
        Err(err) => {
            if !err.is_cancelled() {
                warn!(persisted = err.persisted(), error = %err, "Scan failed");
            }
            Err(err.into())
        }
    }
}

pub(crate) async fn open_sink(url: &str) -> Result<SqliteSink> {
    SqliteSink::connect(url)
        .await
        .map_err(|e| HelpfulError::database_unavailable(url, &e.to_string()).into())
}

fn spawn_interrupt_handler(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current batch");
            cancel.cancel();
        }
    })
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message("Scanning...");
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
