//! Shared logging setup for treeload binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "treeload=info,treeload_scout=info,treeload_sinks=info";
const MAX_LOG_FILES: usize = 7;

/// Logging configuration shared by treeload binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Directory for the daily log files
    pub log_dir: PathBuf,
    /// Mirror debug output to stderr
    pub verbose: bool,
    /// Only warnings and errors on stderr (progress bars own the terminal)
    pub quiet: bool,
}

/// Keeps the background file writer alive. Buffered lines are flushed when
/// this is dropped, so hold it until the process exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    file: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn file_logging(&self) -> bool {
        self.file.is_some()
    }
}

/// Initialize tracing with a daily log file and stderr output.
///
/// If the log directory cannot be prepared, falls back to stderr only and
/// says so once the subscriber is installed.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let console_filter = if config.verbose {
        EnvFilter::new(DEFAULT_LOG_FILTER.replace("=info", "=debug"))
    } else if config.quiet {
        EnvFilter::new("warn")
    } else {
        env_filter()
    };

    match ensure_dir(&config.log_dir).and_then(|dir| file_appender(&dir, config.app_name)) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_filter(env_filter()),
                )
                .with(console_layer(console_filter))
                .try_init()
                .context("Failed to install tracing subscriber")?;
            Ok(LogGuard { file: Some(guard) })
        }
        Err(err) => {
            tracing_subscriber::registry()
                .with(console_layer(console_filter))
                .try_init()
                .context("Failed to install tracing subscriber")?;
            tracing::warn!(
                log_dir = %config.log_dir.display(),
                error = %format!("{:#}", err),
                "File logging disabled"
            );
            Ok(LogGuard { file: None })
        }
    }
}

/// `<dir>/<app_name>.<date>.log`, rotated daily, oldest files pruned.
fn file_appender(dir: &Path, app_name: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(app_name)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

fn console_layer<S>(filter: EnvFilter) -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter)
}

/// `RUST_LOG` if set, otherwise the crate defaults.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_file_appender_writes_dated_log() {
        let tmp = TempDir::new().unwrap();
        let mut appender = file_appender(tmp.path(), "treeload").unwrap();
        appender.write_all(b"scan started\n").unwrap();
        appender.flush().unwrap();

        let files: Vec<PathBuf> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("treeload."), "{}", name);
        assert!(name.ends_with(".log"), "{}", name);
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), "scan started\n");
    }

    #[test]
    fn test_unusable_log_dir_falls_back_to_stderr() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let guard = init_logging(LogConfig {
            app_name: "treeload",
            log_dir: blocker.join("logs"),
            verbose: false,
            quiet: true,
        })
        .unwrap();
        assert!(!guard.file_logging());
    }
}
