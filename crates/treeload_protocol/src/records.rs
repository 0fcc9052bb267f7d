//! Record types produced by discovery and consumed by sinks.
//!
//! Records are immutable once built. The only way to construct a
//! [`FileRecord`] is through [`FileRecord::readable`] or
//! [`FileRecord::unreadable`], which keeps the content/hash/readable fields
//! consistent with each other.

use crate::hashing::content_hash;
use crate::ids::RunId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// File Records
// ============================================================================

/// Filesystem metadata captured for one discovered file.
///
/// Timestamps are `None` when the platform could not report them; that is
/// the "unknown" sentinel, never a fabricated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Absolute path to the file
    pub full_path: String,
    /// Final path component
    pub file_name: String,
    /// Extension including the leading dot, empty if none
    pub file_extension: String,
    /// Absolute path of the containing directory
    pub directory_path: String,
    /// File size in bytes
    pub file_size_bytes: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    pub accessed_at: Option<DateTime<Utc>>,
}

impl FileMetadata {
    /// Metadata derived from the path alone: name, extension and directory
    /// are filled in lexically, size is zero and all timestamps are unknown.
    ///
    /// Used when reading filesystem metadata failed (e.g. the file vanished
    /// mid-walk).
    pub fn from_path(path: &Path) -> Self {
        Self {
            full_path: path.to_string_lossy().into_owned(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_extension: extension_with_dot(path),
            directory_path: path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_size_bytes: 0,
            created_at: None,
            modified_at: None,
            accessed_at: None,
        }
    }
}

/// Extension of `path` with a leading dot (`".txt"`), or an empty string.
pub fn extension_with_dot(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// One discovered file, tagged with the run that found it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    run_id: RunId,
    #[serde(flatten)]
    metadata: FileMetadata,
    content: Option<String>,
    content_hash: Option<String>,
    is_readable: bool,
    error_message: Option<String>,
}

impl FileRecord {
    /// A file whose content was read successfully. The content hash is
    /// computed here so it can never disagree with `content`.
    pub fn readable(run_id: RunId, metadata: FileMetadata, content: String) -> Self {
        let hash = content_hash(&content);
        Self {
            run_id,
            metadata,
            content: Some(content),
            content_hash: Some(hash),
            is_readable: true,
            error_message: None,
        }
    }

    /// A file whose content was not read, with the reason why.
    pub fn unreadable(run_id: RunId, metadata: FileMetadata, reason: impl Into<String>) -> Self {
        Self {
            run_id,
            metadata,
            content: None,
            content_hash: None,
            is_readable: false,
            error_message: Some(reason.into()),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn full_path(&self) -> &str {
        &self.metadata.full_path
    }

    pub fn file_name(&self) -> &str {
        &self.metadata.file_name
    }

    pub fn file_extension(&self) -> &str {
        &self.metadata.file_extension
    }

    pub fn directory_path(&self) -> &str {
        &self.metadata.directory_path
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.metadata.file_size_bytes
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.metadata.created_at
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.metadata.modified_at
    }

    pub fn accessed_at(&self) -> Option<DateTime<Utc>> {
        self.metadata.accessed_at
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    pub fn is_readable(&self) -> bool {
        self.is_readable
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

// ============================================================================
// Deployment / Run Context
// ============================================================================

/// Release metadata attached to a run. Free-form; not parsed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentMetadata {
    /// Caller-defined tag list (delimiter convention is the caller's)
    pub tags: Option<String>,
    /// Deployment label
    pub deployment: Option<String>,
    pub deployment_date: DateTime<Utc>,
}

impl DeploymentMetadata {
    /// Build metadata, defaulting the date to now when not given.
    pub fn new(
        tags: Option<String>,
        deployment: Option<String>,
        deployment_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            tags: tags.filter(|t| !t.trim().is_empty()),
            deployment: deployment.filter(|d| !d.trim().is_empty()),
            deployment_date: deployment_date.unwrap_or_else(Utc::now),
        }
    }
}

/// One run's release metadata, written once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub run_id: RunId,
    pub tags: Option<String>,
    pub deployment: Option<String>,
    pub deployment_date: DateTime<Utc>,
}

/// Read-only context shared by discovery and loading.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    pub deployment: Option<DeploymentMetadata>,
}

impl RunContext {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            deployment: None,
        }
    }

    pub fn with_deployment(mut self, deployment: DeploymentMetadata) -> Self {
        self.deployment = Some(deployment);
        self
    }

    /// The deployment record for this run, if deployment metadata was given.
    pub fn deployment_record(&self) -> Option<DeploymentRecord> {
        self.deployment.as_ref().map(|meta| DeploymentRecord {
            run_id: self.run_id.clone(),
            tags: meta.tags.clone(),
            deployment: meta.deployment.clone(),
            deployment_date: meta.deployment_date,
        })
    }
}
