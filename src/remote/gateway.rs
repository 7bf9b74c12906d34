use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{ObjectStore, RemoteError, Snapshot, SnapshotGateway};
use crate::archive::{self, ARCHIVE_EXTENSION};
use crate::storage::StorageBackend;

const STAGING_PREFIX: &str = ".tapedeck-staging-";

/// [`SnapshotGateway`] that packs stores with the archive codec and moves
/// the archives through an [`ObjectStore`].
///
/// Packing, unpacking and the staging directory always use the local
/// filesystem. `storage` performs the final swap into the destination, so it
/// must see the same filesystem (normally [`LocalStorage`](crate::storage::LocalStorage)).
pub struct ArchiveGateway<S> {
    store: S,
    storage: Arc<dyn StorageBackend>,
    scratch_dir: Option<PathBuf>,
}

impl<S: ObjectStore> ArchiveGateway<S> {
    pub fn new(store: S, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            store,
            storage,
            scratch_dir: None,
        }
    }

    /// Directory for packed archives awaiting upload (system temp by default).
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn object_store(&self) -> &S {
        &self.store
    }

    /// Move `new_tree` to `destination`, replacing whatever is there.
    ///
    /// The old destination is parked at `backup` first and moved back if the
    /// new tree cannot be moved into place. If that fails too the result is
    /// [`RemoteError::RestoreFailed`] and `backup` holds the only copy.
    async fn swap_into_place(
        &self,
        new_tree: &Path,
        destination: &Path,
        backup: &Path,
    ) -> Result<(), RemoteError> {
        if !self.storage.exists(destination).await {
            self.storage.move_item(new_tree, destination).await?;
            return Ok(());
        }

        self.storage.move_item(destination, backup).await?;
        if let Err(e) = self.storage.move_item(new_tree, destination).await {
            if let Err(restore) = self.storage.move_item(backup, destination).await {
                return Err(RemoteError::RestoreFailed {
                    backup: backup.to_path_buf(),
                    source: e,
                    restore,
                });
            }
            return Err(e.into());
        }

        if let Err(e) = self.storage.remove(backup).await {
            tracing::warn!(
                backup = %backup.display(),
                error = %e,
                "Failed to remove previous snapshot directory"
            );
        }
        Ok(())
    }
}

fn staging_parent(destination: &Path) -> PathBuf {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[async_trait]
impl<S: ObjectStore> SnapshotGateway for ArchiveGateway<S> {
    async fn list(&self) -> Result<Vec<Snapshot>, RemoteError> {
        let mut snapshots: Vec<Snapshot> = self
            .store
            .list_objects()
            .await?
            .into_iter()
            .filter_map(|object| match Snapshot::from_metadata(&object.metadata) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::debug!(object = %object.name, error = %e, "Skipping remote object");
                    None
                }
            })
            .collect();
        snapshots.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.name.cmp(&b.name)));
        Ok(snapshots)
    }

    async fn upload(
        &self,
        local_dir: &Path,
        file_list: Vec<String>,
    ) -> Result<Snapshot, RemoteError> {
        let source = local_dir.to_path_buf();
        let scratch = self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir);
        // Dropping `packed` deletes the local archive whatever happens below.
        let packed =
            tokio::task::spawn_blocking(move || archive::pack_in(&source, &scratch)).await??;

        let name = format!("{}.{}", Uuid::new_v4(), ARCHIVE_EXTENSION);
        let snapshot = Snapshot::new(name, Utc::now(), file_list);
        self.store
            .put_object(&snapshot.name, packed.path(), &snapshot.to_metadata())
            .await?;

        tracing::info!(
            snapshot = %snapshot.name,
            files = snapshot.file_list.len(),
            "Uploaded snapshot"
        );
        Ok(snapshot)
    }

    async fn remove(&self, snapshot: &Snapshot) -> Result<(), RemoteError> {
        self.store.delete_object(&snapshot.name).await?;
        tracing::info!(snapshot = %snapshot.name, "Removed remote snapshot");
        Ok(())
    }

    async fn download_and_install(
        &self,
        snapshot: &Snapshot,
        destination: &Path,
    ) -> Result<(), RemoteError> {
        // Staging next to the destination keeps every move a same-filesystem rename.
        let parent = staging_parent(destination);
        self.storage.create_directory(&parent, true).await?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&parent)?;

        let archive_path = staging
            .path()
            .join(format!("download.{ARCHIVE_EXTENSION}"));
        self.store.get_object(&snapshot.name, &archive_path).await?;

        let unpacked = staging.path().join("tree");
        let unpack_source = archive_path.clone();
        let unpack_dest = unpacked.clone();
        let summary = tokio::task::spawn_blocking(move || {
            archive::unpack(&unpack_source, &unpack_dest)
        })
        .await??;

        let backup = staging.path().join("previous");
        if let Err(e) = self.swap_into_place(&unpacked, destination, &backup).await {
            if matches!(e, RemoteError::RestoreFailed { .. }) {
                // The previous store lives in staging now; dropping it would delete it.
                let kept = staging.into_path();
                tracing::error!(
                    destination = %destination.display(),
                    kept = %kept.display(),
                    error = %e,
                    "Failed to restore snapshot directory after failed install"
                );
            }
            return Err(e);
        }

        tracing::info!(
            snapshot = %snapshot.name,
            destination = %destination.display(),
            files = summary.files,
            skipped = summary.skipped.len(),
            "Installed snapshot"
        );
        Ok(())
    }
}
