//! Size parsing and run summary rendering.

use serde::Serialize;
use std::path::PathBuf;
use treeload_scout::RunSummary;

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Parse a human-readable size string into bytes
///
/// Examples:
/// - "100" -> Ok(100)
/// - "1KB" -> Ok(1024)
/// - "10MB" -> Ok(10485760)
/// - "1.5GB" -> Ok(1610612736)
pub fn parse_size(size_str: &str) -> Result<u64, String> {
    let size_str = size_str.trim().to_uppercase();

    let (num_part, unit_part) = split_number_unit(&size_str);

    let num: f64 = num_part
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: '{}'", num_part))?;
    if !num.is_finite() || num < 0.0 {
        return Err(format!("Size must be a non-negative number: '{}'", num_part));
    }

    let multiplier: u64 = match unit_part.trim() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => 1024,
        "M" | "MB" | "MIB" => 1024 * 1024,
        "G" | "GB" | "GIB" => 1024 * 1024 * 1024,
        "T" | "TB" | "TIB" => 1024 * 1024 * 1024 * 1024,
        other => return Err(format!("Unknown unit: '{}'", other)),
    };

    Ok((num * multiplier as f64) as u64)
}

/// Split a size string into number and unit parts
fn split_number_unit(s: &str) -> (&str, &str) {
    let idx = s
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    (&s[..idx], &s[idx..])
}

/// Everything printed after a successful scan.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub status: &'static str,
    pub root: PathBuf,
    pub database: String,
    #[serde(flatten)]
    pub summary: RunSummary,
}

impl ScanReport {
    pub fn completed(root: PathBuf, database: String, summary: RunSummary) -> Self {
        Self {
            status: "completed",
            root,
            database,
            summary,
        }
    }

    pub fn print(&self, json: bool) -> anyhow::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
        } else {
            print!("{}", self.render_text());
        }
        Ok(())
    }

    pub fn render_text(&self) -> String {
        let load = &self.summary.load;
        let stats = &self.summary.discovery;
        let mut out = String::new();
        out.push_str(&format!("Run:        {}\n", self.summary.run_id));
        out.push_str(&format!("Root:       {}\n", self.root.display()));
        out.push_str(&format!("Database:   {}\n", self.database));
        out.push_str(&format!(
            "Persisted:  {} records in {} batches ({:.2}s)\n",
            load.persisted,
            load.batches,
            load.duration_ms as f64 / 1000.0
        ));
        out.push_str(&format!(
            "Content:    {} read ({}), {} binary, {} too large, {} failed\n",
            stats.files_readable,
            format_size(stats.bytes_read),
            stats.files_skipped_binary,
            stats.files_skipped_large,
            stats.files_failed
        ));
        if stats.entries_skipped > 0 {
            out.push_str(&format!(
                "Skipped:    {} inaccessible entries\n",
                stats.entries_skipped
            ));
        }
        out
    }
}
