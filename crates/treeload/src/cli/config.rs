//! Run configuration
//!
//! Values come from, highest priority first:
//! 1. command-line flags
//! 2. environment (`TREELOAD_DATABASE_URL`, `TREELOAD_BATCH_SIZE`,
//!    `TREELOAD_MAX_CONTENT_SIZE`; applied by clap)
//! 3. the TOML file given with `--config`
//! 4. built-in defaults

use crate::cli::error::HelpfulError;
use crate::cli::output::parse_size;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use treeload_protocol::paths::default_database_url;
use treeload_protocol::{DeploymentMetadata, RunContext, RunId};
use treeload_scout::{ContentClassifier, PipelineOptions, DEFAULT_BATCH_SIZE, DEFAULT_MAX_CONTENT_SIZE};

pub use treeload_protocol::paths::default_logs_dir;

/// Contents of a `--config` TOML file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub batch_size: Option<usize>,
    /// Bytes, or a size string such as "100MB"
    pub max_content_size: Option<SizeSetting>,
    pub channel_capacity: Option<usize>,
    /// Replaces the built-in binary extension list
    pub binary_extensions: Option<Vec<String>>,
    pub tags: Option<String>,
    pub deployment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SizeSetting {
    Bytes(u64),
    Text(String),
}

impl SizeSetting {
    fn resolve(&self) -> Result<u64, HelpfulError> {
        match self {
            SizeSetting::Bytes(bytes) => Ok(*bytes),
            SizeSetting::Text(text) => parse_size(text).map_err(|e| HelpfulError::invalid_size_format(text, &e)),
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, HelpfulError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HelpfulError::config_error(path, &e.to_string()))?;
        Self::parse(&text).map_err(|e| HelpfulError::config_error(path, &e))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }
}

/// Scan inputs as given on the command line (after clap applied env vars).
#[derive(Debug, Clone, Default)]
pub struct ScanInputs {
    pub root: String,
    pub database: Option<String>,
    pub batch_size: Option<usize>,
    pub max_content_size: Option<String>,
    pub run_id: Option<String>,
    pub tags: Option<String>,
    pub deployment: Option<String>,
    pub deployment_date: Option<String>,
    pub config: Option<PathBuf>,
}

/// Fully resolved settings for one scan.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub root: PathBuf,
    pub database_url: String,
    pub options: PipelineOptions,
    pub binary_extensions: Option<Vec<String>>,
    pub context: RunContext,
}

impl ScanSettings {
    pub fn classifier(&self) -> ContentClassifier {
        match &self.binary_extensions {
            Some(list) => ContentClassifier::new(list),
            None => ContentClassifier::default(),
        }
    }
}

impl ScanInputs {
    /// Merge flags with the config file and defaults.
    ///
    /// Numeric values are passed through unchecked; the pipeline rejects
    /// zero batch or content sizes before it writes anything.
    pub fn resolve(self) -> Result<ScanSettings, HelpfulError> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        self.resolve_with(file, |name| std::env::var(name).ok())
    }

    pub fn resolve_with(
        self,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ScanSettings, HelpfulError> {
        let root = expand_path(&self.root, &env);

        let database_url = self
            .database
            .or(file.database_url)
            .unwrap_or_else(default_database_url);

        let batch_size = self.batch_size.or(file.batch_size).unwrap_or(DEFAULT_BATCH_SIZE);

        let max_content_size_bytes = match (&self.max_content_size, &file.max_content_size) {
            (Some(text), _) => {
                parse_size(text).map_err(|e| HelpfulError::invalid_size_format(text, &e))?
            }
            (None, Some(setting)) => setting.resolve()?,
            (None, None) => DEFAULT_MAX_CONTENT_SIZE,
        };

        let run_id = match &self.run_id {
            Some(raw) => RunId::parse(raw).map_err(|e| HelpfulError::invalid_run_id(raw, &e.to_string()))?,
            None => RunId::new(),
        };

        let deployment_date = self
            .deployment_date
            .as_deref()
            .map(|raw| parse_deployment_date(raw).ok_or_else(|| HelpfulError::invalid_date(raw)))
            .transpose()?;

        // Every run is registered, even without tags or a label.
        let deployment = DeploymentMetadata::new(
            self.tags.or(file.tags),
            self.deployment.or(file.deployment),
            deployment_date,
        );

        Ok(ScanSettings {
            root,
            database_url,
            options: PipelineOptions {
                batch_size,
                max_content_size_bytes,
                channel_capacity: file.channel_capacity,
            },
            binary_extensions: file.binary_extensions,
            context: RunContext::new(run_id).with_deployment(deployment),
        })
    }
}

/// Parse a deployment date as RFC 3339, `YYYY-MM-DD HH:MM:SS` or
/// `YYYY-MM-DD`. Zone-less forms are UTC.
pub fn parse_deployment_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references.
///
/// Unknown variables are left as written.
pub fn expand_path(raw: &str, env: impl Fn(&str) -> Option<String>) -> PathBuf {
    let raw = raw.trim();
    let home = || env("HOME").or_else(|| env("USERPROFILE"));

    let tilde_expanded = if raw == "~" {
        home().unwrap_or_else(|| raw.to_string())
    } else if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        match home() {
            Some(h) => format!("{}/{}", h.trim_end_matches(['/', '\\']), rest),
            None => raw.to_string(),
        }
    } else {
        raw.to_string()
    };

    PathBuf::from(expand_vars(&tilde_expanded, &env))
}

fn expand_vars(input: &str, env: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (!name.is_empty()).then(|| env(name)).flatten() {
            Some(value) => out.push_str(&value),
            None => {
                out.push('$');
                out.push_str(&after[..consumed]);
            }
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}
