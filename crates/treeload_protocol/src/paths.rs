use std::path::{Path, PathBuf};
use std::sync::Once;

static CREATE_DIR_WARNED: Once = Once::new();

/// Resolve treeload home directory.
///
/// Priority:
/// 1) TREELOAD_HOME
/// 2) HOME/USERPROFILE
/// 3) ./.treeload
pub fn treeload_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("TREELOAD_HOME") {
        return PathBuf::from(override_path);
    }
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        return PathBuf::from(home).join(".treeload");
    }
    PathBuf::from(".").join(".treeload")
}

fn ensure_home_dir(home: &Path) {
    if let Err(err) = std::fs::create_dir_all(home) {
        CREATE_DIR_WARNED.call_once(|| {
            tracing::warn!(
                home = %home.display(),
                error = %err,
                "Failed to create treeload home directory; set TREELOAD_HOME or pass --database"
            );
        });
    }
}

/// Default database path: ~/.treeload/treeload.sqlite3
pub fn default_database_path() -> PathBuf {
    let home = treeload_home();
    ensure_home_dir(&home);
    home.join("treeload.sqlite3")
}

/// Default database URL (sqlite: path).
pub fn default_database_url() -> String {
    format!("sqlite:{}", default_database_path().display())
}

/// Default logs directory: ~/.treeload/logs
pub fn default_logs_dir() -> PathBuf {
    let home = treeload_home();
    ensure_home_dir(&home);
    home.join("logs")
}
