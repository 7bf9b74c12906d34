//! Remote snapshot storage
//!
//! A remote snapshot is the whole local store packed into one archive and
//! pushed to an object store, with a [`Snapshot`] descriptor encoded into the
//! object's own metadata. [`SnapshotGateway`] is the contract consumers use;
//! [`ArchiveGateway`] implements it on top of any [`ObjectStore`] transport.

mod directory;
mod gateway;
mod object_store;
mod snapshot;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::archive::{PackError, UnpackError};

pub use directory::DirectoryObjectStore;
pub use gateway::ArchiveGateway;
pub use object_store::{ObjectStore, RemoteObject};
pub use snapshot::{MetadataDecodeError, ObjectMetadata, Snapshot};

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote transport failed: {0}")]
    Transport(String),
    #[error("Remote object not found: {0}")]
    NotFound(String),
    #[error("Invalid remote object name: {0:?}")]
    InvalidObjectName(String),
    #[error("Failed to pack snapshot: {0}")]
    Pack(#[from] PackError),
    #[error("Failed to unpack snapshot: {0}")]
    Unpack(#[from] UnpackError),
    #[error("Archive task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Installing failed and the previous store could not be moved back.
    /// Its contents are left at `backup`.
    #[error(
        "Install failed ({source}) and the previous store could not be restored ({restore}); it was kept at {}",
        .backup.display()
    )]
    RestoreFailed {
        backup: PathBuf,
        source: std::io::Error,
        restore: std::io::Error,
    },
}

/// Operations on remote snapshots of a local store.
///
/// `upload` and `download_and_install` both touch the local store and must
/// not run concurrently against the same directory; callers serialize them.
/// The other operations are independent.
#[async_trait]
pub trait SnapshotGateway: Send + Sync {
    /// All remote snapshots, newest first. Objects with undecodable metadata
    /// are left out.
    async fn list(&self) -> Result<Vec<Snapshot>, RemoteError>;

    /// Pack `local_dir` and push it under a fresh unique name.
    async fn upload(&self, local_dir: &Path, file_list: Vec<String>)
        -> Result<Snapshot, RemoteError>;

    async fn remove(&self, snapshot: &Snapshot) -> Result<(), RemoteError>;

    /// Fetch a snapshot and replace the contents of `destination` with it.
    async fn download_and_install(
        &self,
        snapshot: &Snapshot,
        destination: &Path,
    ) -> Result<(), RemoteError>;
}
