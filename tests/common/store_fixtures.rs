//! Snapshot store fixtures
//!
//! A `TestHome` is a throwaway data directory with the same layout the binary
//! uses, so library-level and CLI-level tests see identical paths.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tapedeck::{
    ArchiveGateway, DirectoryObjectStore, EngineOptions, FilePreferences, LocalStorage, Mode,
    SnapshotEngine,
};
use tempfile::TempDir;

pub struct TestHome {
    /// TempDir handle (keeps directory alive until dropped)
    _dir: TempDir,
    /// Root of the data directory
    pub path: PathBuf,
}

impl TestHome {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().to_path_buf();
        Self { _dir: dir, path }
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.path.join("snapshots")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.path.join("preferences.json")
    }

    pub fn remote_dir(&self) -> PathBuf {
        self.path.join("remote")
    }

    /// Open an engine on this home, as a fresh process would.
    pub async fn engine(&self, default_mode: Mode, restore_previous: bool) -> SnapshotEngine {
        self.engine_at(self.snapshots_dir(), default_mode, restore_previous)
            .await
    }

    pub async fn engine_at(
        &self,
        base_dir: PathBuf,
        default_mode: Mode,
        restore_previous: bool,
    ) -> SnapshotEngine {
        SnapshotEngine::initialize(
            EngineOptions {
                default_mode,
                restore_previous,
                base_dir,
            },
            Arc::new(LocalStorage::new()),
            Arc::new(FilePreferences::open(self.preferences_path())),
        )
        .await
    }

    pub fn gateway(&self) -> ArchiveGateway<DirectoryObjectStore> {
        ArchiveGateway::new(
            DirectoryObjectStore::new(self.remote_dir()),
            Arc::new(LocalStorage::new()),
        )
    }

    pub fn write_config(&self, contents: &str) {
        fs::write(self.path.join("config.toml"), contents).expect("Failed to write config");
    }
}

/// Contents of `dir` as sorted `(file name, contents)` pairs.
pub fn read_store(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = fs::read_dir(dir)
        .expect("Failed to read store")
        .map(|entry| {
            let entry = entry.unwrap();
            (
                entry.file_name().to_string_lossy().into_owned(),
                fs::read(entry.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}
