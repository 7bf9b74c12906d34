use std::path::Path;

use async_trait::async_trait;

use super::{ObjectMetadata, RemoteError};

/// An object as reported by [`ObjectStore::list_objects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub name: String,
    /// Custom metadata attached at upload time; empty if none could be read.
    pub metadata: ObjectMetadata,
}

/// Transport for snapshot archives: a flat namespace of named blobs with
/// string metadata.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_objects(&self) -> Result<Vec<RemoteObject>, RemoteError>;

    /// Upload the file at `source` as `name`, replacing any existing object.
    async fn put_object(
        &self,
        name: &str,
        source: &Path,
        metadata: &ObjectMetadata,
    ) -> Result<(), RemoteError>;

    /// Download `name` into the file at `destination`.
    async fn get_object(&self, name: &str, destination: &Path) -> Result<(), RemoteError>;

    async fn delete_object(&self, name: &str) -> Result<(), RemoteError>;
}
