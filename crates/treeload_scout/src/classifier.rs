//! Decides whether a file's content should be read.
//!
//! Rules, first match wins:
//! 1. extension in the binary set -> skip ("binary file")
//! 2. size >= limit               -> skip ("file too large")
//! 3. otherwise                   -> read

use std::collections::HashSet;

/// Extensions whose content is never read.
///
/// Executables and libraries, archives, images, audio/video, office
/// documents, fonts and databases. Compared case-insensitively, without the
/// leading dot.
pub const DEFAULT_BINARY_EXTENSIONS: &[&str] = &[
    // Executables, libraries, object code
    "exe", "dll", "so", "dylib", "bin", "o", "obj", "a", "lib", "pdb", "class", "pyc", "pyo",
    "wasm", "msi", "com", "sys",
    // Archives and disk images
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "jar", "war", "nupkg", "iso", "dmg",
    "cab", "deb", "rpm", "zst",
    // Images
    "jpg", "jpeg", "png", "gif", "bmp", "ico", "tif", "tiff", "webp", "psd", "heic",
    // Audio / video
    "mp3", "wav", "flac", "ogg", "aac", "m4a", "wma", "mp4", "avi", "mkv", "mov", "wmv", "flv",
    "webm",
    // Office documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp",
    // Fonts
    "ttf", "otf", "woff", "woff2", "eot",
    // Databases
    "db", "sqlite", "sqlite3", "mdb", "accdb",
];

/// Why content was not read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Binary,
    TooLarge,
}

impl SkipReason {
    /// Human-readable reason stored in the record's error message.
    pub fn message(&self) -> &'static str {
        match self {
            SkipReason::Binary => "Binary file - content not read",
            SkipReason::TooLarge => "File too large - content not read",
        }
    }
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDecision {
    Read,
    Skip(SkipReason),
}

/// Content read policy. Pure and total: never fails, no side effects.
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    binary_extensions: HashSet<String>,
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY_EXTENSIONS.iter().copied())
    }
}

impl ContentClassifier {
    /// Build a classifier over a custom binary extension set.
    ///
    /// Entries may be given with or without the leading dot, in any case.
    pub fn new<I, S>(binary_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            binary_extensions: binary_extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    pub fn is_binary_extension(&self, extension: &str) -> bool {
        let ext = normalize_extension(extension);
        !ext.is_empty() && self.binary_extensions.contains(&ext)
    }

    pub fn classify(&self, extension: &str, size_bytes: u64, max_size_bytes: u64) -> ContentDecision {
        if self.is_binary_extension(extension) {
            ContentDecision::Skip(SkipReason::Binary)
        } else if size_bytes >= max_size_bytes {
            ContentDecision::Skip(SkipReason::TooLarge)
        } else {
            ContentDecision::Read
        }
    }

    pub fn should_read(&self, extension: &str, size_bytes: u64, max_size_bytes: u64) -> bool {
        self.classify(extension, size_bytes, max_size_bytes) == ContentDecision::Read
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
