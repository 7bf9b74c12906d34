//! Path utilities for tapedeck data directories

use std::path::PathBuf;
use std::sync::OnceLock;

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Call early in main() before any other path function is used.
/// If custom_path is None, uses the default ~/.tapedeck location.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".tapedeck"))
        .unwrap_or_else(|| PathBuf::from(".tapedeck"))
}

/// Get the base data directory.
/// Returns the custom path if set via init_data_dir(), otherwise ~/.tapedeck
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Get the config file path (~/.tapedeck/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Get the logs directory (~/.tapedeck/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Get the log file path (~/.tapedeck/logs/tapedeck.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("tapedeck.log")
}

/// Default snapshot store (~/.tapedeck/snapshots)
pub fn snapshots_dir() -> PathBuf {
    data_dir().join("snapshots")
}

/// Persisted preferences (~/.tapedeck/preferences.json)
pub fn preferences_path() -> PathBuf {
    data_dir().join("preferences.json")
}

/// Default directory object store for remote snapshots (~/.tapedeck/remote)
pub fn remote_dir() -> PathBuf {
    data_dir().join("remote")
}
