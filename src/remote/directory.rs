use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{ObjectMetadata, ObjectStore, RemoteError, RemoteObject};

const OBJECTS_DIR: &str = "objects";
const METADATA_DIR: &str = "metadata";

/// [`ObjectStore`] kept in a local (or network-mounted) directory.
///
/// Layout: `objects/<name>` holds the blob, `metadata/<name>.json` its
/// metadata. Useful as a shared snapshot location and in tests.
#[derive(Debug, Clone)]
pub struct DirectoryObjectStore {
    root: PathBuf,
}

impl DirectoryObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, name: &str) -> PathBuf {
        self.root.join(OBJECTS_DIR).join(name)
    }

    fn metadata_path(&self, name: &str) -> PathBuf {
        self.root.join(METADATA_DIR).join(format!("{name}.json"))
    }

    async fn read_metadata(&self, name: &str) -> ObjectMetadata {
        let path = self.metadata_path(name);
        let parsed = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<ObjectMetadata>(&bytes).map_err(io::Error::other),
            Err(e) => Err(e),
        };
        parsed.unwrap_or_else(|e| {
            tracing::debug!(object = name, error = %e, "Unreadable object metadata");
            ObjectMetadata::new()
        })
    }
}

fn validate_name(name: &str) -> Result<(), RemoteError> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(RemoteError::InvalidObjectName(name.to_string()));
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for DirectoryObjectStore {
    async fn list_objects(&self) -> Result<Vec<RemoteObject>, RemoteError> {
        let objects_dir = self.root.join(OBJECTS_DIR);
        let mut entries = match fs::read_dir(&objects_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // In-flight uploads.
            if name.starts_with('.') {
                continue;
            }
            let metadata = self.read_metadata(&name).await;
            objects.push(RemoteObject { name, metadata });
        }
        objects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(objects)
    }

    async fn put_object(
        &self,
        name: &str,
        source: &Path,
        metadata: &ObjectMetadata,
    ) -> Result<(), RemoteError> {
        validate_name(name)?;
        fs::create_dir_all(self.root.join(OBJECTS_DIR)).await?;
        fs::create_dir_all(self.root.join(METADATA_DIR)).await?;

        let encoded = serde_json::to_vec_pretty(metadata).map_err(io::Error::other)?;
        fs::write(self.metadata_path(name), encoded).await?;

        let partial = self.root.join(OBJECTS_DIR).join(format!(".{name}.partial"));
        if let Err(e) = fs::copy(source, &partial).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e.into());
        }
        fs::rename(&partial, self.object_path(name)).await?;
        Ok(())
    }

    async fn get_object(&self, name: &str, destination: &Path) -> Result<(), RemoteError> {
        validate_name(name)?;
        let path = self.object_path(name);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(RemoteError::NotFound(name.to_string()));
        }
        fs::copy(&path, destination).await?;
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> Result<(), RemoteError> {
        validate_name(name)?;
        match fs::remove_file(self.object_path(name)).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RemoteError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        }
        if let Err(e) = fs::remove_file(self.metadata_path(name)).await {
            tracing::debug!(object = name, error = %e, "Failed to remove object metadata");
        }
        Ok(())
    }
}
