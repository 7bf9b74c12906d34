//! Storage backends for the local snapshot store
//!
//! The engine and the snapshot gateway only ever touch the filesystem through
//! [`StorageBackend`], so both can run against [`MemoryStorage`] in tests and
//! against [`LocalStorage`] in a real application.

mod local;
mod memory;

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Filesystem capabilities needed by the snapshot engine.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Whether anything (file or directory) exists at `path`.
    async fn exists(&self, path: &Path) -> bool;

    /// Create a directory. With `recursive`, missing parents are created and an
    /// existing directory is not an error.
    async fn create_directory(&self, path: &Path, recursive: bool) -> io::Result<()>;

    /// List the direct children of a directory as full paths.
    async fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Remove a file, or a directory together with everything below it.
    async fn remove(&self, path: &Path) -> io::Result<()>;

    /// Move (rename) a file or directory.
    async fn move_item(&self, from: &Path, to: &Path) -> io::Result<()>;

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `contents` to `path`, replacing any existing file.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}
