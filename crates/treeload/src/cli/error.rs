//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;
use treeload_scout::{PipelineError, ScanError};

/// Process exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INVALID_INPUT: u8 = 2;
pub const EXIT_CANCELLED: u8 = 130;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
    /// Bad input rather than a runtime failure
    pub invalid_input: bool,
}

impl HelpfulError {
    /// Create a new helpful error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            invalid_input: false,
        }
    }

    /// An error caused by arguments or configuration the user supplied
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            invalid_input: true,
            ..Self::new(message)
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a suggestion for fixing the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add multiple suggestions
    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Path does not exist
    pub fn path_not_found(path: &Path) -> Self {
        Self::invalid_input(format!("Path not found: {}", path.display()))
            .with_context("The specified path does not exist on the filesystem")
            .with_suggestions([
                format!("TRY: Check that the path exists: ls -la {}", path.display()),
                "TRY: Verify you have read permissions for this path".to_string(),
                "TRY: Check for typos in the path".to_string(),
            ])
    }

    /// Invalid size format
    pub fn invalid_size_format(size_str: &str, reason: &str) -> Self {
        Self::invalid_input(format!("Invalid size format: '{}'", size_str))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Use formats like: 100, 1KB, 10MB, 1GB".to_string(),
                "TRY: Valid units: B, KB, MB, GB, TB (case insensitive, 1KB = 1024 bytes)".to_string(),
            ])
    }

    /// Deployment date could not be parsed
    pub fn invalid_date(value: &str) -> Self {
        Self::invalid_input(format!("Invalid deployment date: '{}'", value))
            .with_context("Dates are interpreted as UTC")
            .with_suggestions([
                "TRY: 2024-05-01".to_string(),
                "TRY: 2024-05-01 13:45:00".to_string(),
                "TRY: 2024-05-01T13:45:00Z (RFC 3339)".to_string(),
            ])
    }

    /// Run id is not a UUID
    pub fn invalid_run_id(value: &str, reason: &str) -> Self {
        Self::invalid_input(format!("Invalid run id: '{}'", value))
            .with_context(reason.to_string())
            .with_suggestion("TRY: Omit --run-id to generate one")
    }

    /// Config file missing or malformed
    pub fn config_error(path: &Path, reason: &str) -> Self {
        Self::invalid_input(format!("Cannot load config file: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                format!("TRY: Check the file exists: ls -la {}", path.display()),
                "TRY: Valid keys: database_url, batch_size, max_content_size, channel_capacity, binary_extensions, tags, deployment".to_string(),
            ])
    }

    /// Database could not be opened
    pub fn database_unavailable(url: &str, reason: &str) -> Self {
        Self::new(format!("Cannot open database: {}", url))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Check the directory is writable".to_string(),
                "TRY: Pass a different location with --database sqlite:/path/to/file.sqlite3".to_string(),
            ])
    }

    /// Input rejected by the pipeline before any work started
    pub fn from_validation(err: &PipelineError) -> Self {
        match err {
            PipelineError::Scan(ScanError::NotFound(path)) => Self::path_not_found(path),
            other => Self::invalid_input(other.to_string())
                .with_suggestion("TRY: treeload scan --help"),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Map a command failure to the process exit code.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(pipeline) = err.downcast_ref::<PipelineError>() {
        if pipeline.is_cancelled() {
            return EXIT_CANCELLED;
        }
        if pipeline.is_validation() {
            return EXIT_INVALID_INPUT;
        }
        return EXIT_FAILURE;
    }
    match err.downcast_ref::<HelpfulError>() {
        Some(helpful) if helpful.invalid_input => EXIT_INVALID_INPUT,
        _ => EXIT_FAILURE,
    }
}

/// Records committed before a failed run, if the failure came from one.
pub fn persisted_before_failure(err: &anyhow::Error) -> Option<u64> {
    err.downcast_ref::<PipelineError>().map(PipelineError::persisted)
}

/// Print an error as a JSON object on stdout.
pub fn print_json_error(err: &anyhow::Error) {
    let payload = serde_json::json!({
        "status": if exit_code(err) == EXIT_CANCELLED { "cancelled" } else { "failed" },
        "error": format!("{:#}", err),
        "persisted": persisted_before_failure(err),
    });
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use treeload_scout::LoadError;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Something went wrong")
            .with_context("While processing data")
            .with_suggestion("Try again");

        let display = format!("{}", err);
        assert!(display.contains("ERROR: Something went wrong"));
        assert!(display.contains("CONTEXT: While processing data"));
        assert!(display.contains("Try again"));
    }

    #[test]
    fn test_path_not_found() {
        let path = PathBuf::from("/nonexistent/path");
        let err = HelpfulError::path_not_found(&path);

        let display = format!("{}", err);
        assert!(display.contains("/nonexistent/path"));
        assert!(display.contains("TRY:"));
        assert!(err.invalid_input);
    }

    #[test]
    fn test_exit_codes() {
        let cancelled = anyhow::Error::new(PipelineError::from(LoadError::Cancelled { persisted: 7 }));
        assert_eq!(exit_code(&cancelled), EXIT_CANCELLED);
        assert_eq!(persisted_before_failure(&cancelled), Some(7));

        let bad_batch = anyhow::Error::new(PipelineError::from(LoadError::Validation("zero".into())));
        assert_eq!(exit_code(&bad_batch), EXIT_INVALID_INPUT);

        let bad_size = anyhow::Error::new(HelpfulError::invalid_size_format("10XB", "Unknown unit"));
        assert_eq!(exit_code(&bad_size), EXIT_INVALID_INPUT);

        let db = anyhow::Error::new(HelpfulError::database_unavailable("sqlite:/x", "denied"));
        assert_eq!(exit_code(&db), EXIT_FAILURE);
        assert_eq!(persisted_before_failure(&db), None);
    }

    #[test]
    fn test_exit_code_survives_context() {
        let err = anyhow::Error::new(PipelineError::from(LoadError::Cancelled { persisted: 0 }))
            .context("Scan of /data failed");
        assert_eq!(exit_code(&err), EXIT_CANCELLED);
    }
}
