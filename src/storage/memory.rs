use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::StorageBackend;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Directory,
    File(Vec<u8>),
}

/// In-memory [`StorageBackend`] for tests.
///
/// Paths are treated literally; the root `/` always exists.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files currently stored, regardless of directory.
    pub fn file_count(&self) -> usize {
        self.nodes
            .lock()
            .values()
            .filter(|node| matches!(node, Node::File(_)))
            .count()
    }

    fn is_directory(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
        path.parent().is_none() || matches!(nodes.get(path), Some(Node::Directory))
    }

    fn parent_is_directory(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
        match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => true,
            Some(parent) => Self::is_directory(nodes, parent),
            None => false,
        }
    }

    /// The path itself plus every path below it.
    fn subtree(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> Vec<PathBuf> {
        nodes
            .keys()
            .filter(|key| key.starts_with(path))
            .cloned()
            .collect()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn exists(&self, path: &Path) -> bool {
        let nodes = self.nodes.lock();
        path.parent().is_none() || nodes.contains_key(path)
    }

    async fn create_directory(&self, path: &Path, recursive: bool) -> io::Result<()> {
        let mut nodes = self.nodes.lock();
        match nodes.get(path) {
            Some(Node::Directory) if recursive => return Ok(()),
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("already exists: {}", path.display()),
                ))
            }
            None => {}
        }

        if recursive {
            for ancestor in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
                if ancestor.parent().is_none() || ancestor.as_os_str().is_empty() {
                    continue;
                }
                match nodes.get(ancestor) {
                    Some(Node::Directory) => {}
                    Some(Node::File(_)) => {
                        return Err(io::Error::new(
                            io::ErrorKind::Other,
                            format!("not a directory: {}", ancestor.display()),
                        ))
                    }
                    None => {
                        nodes.insert(ancestor.to_path_buf(), Node::Directory);
                    }
                }
            }
            Ok(())
        } else {
            if !Self::parent_is_directory(&nodes, path) {
                return Err(not_found(path));
            }
            nodes.insert(path.to_path_buf(), Node::Directory);
            Ok(())
        }
    }

    async fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let nodes = self.nodes.lock();
        if !Self::is_directory(&nodes, path) {
            return Err(not_found(path));
        }
        Ok(nodes
            .keys()
            .filter(|key| key.parent() == Some(path))
            .cloned()
            .collect())
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.lock();
        if !nodes.contains_key(path) {
            return Err(not_found(path));
        }
        for key in Self::subtree(&nodes, path) {
            nodes.remove(&key);
        }
        Ok(())
    }

    async fn move_item(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut nodes = self.nodes.lock();
        if !nodes.contains_key(from) {
            return Err(not_found(from));
        }
        if !Self::parent_is_directory(&nodes, to) {
            return Err(not_found(to));
        }
        for key in Self::subtree(&nodes, to) {
            nodes.remove(&key);
        }
        for key in Self::subtree(&nodes, from) {
            if let Some(node) = nodes.remove(&key) {
                let relative = key.strip_prefix(from).unwrap_or(Path::new(""));
                let target = if relative.as_os_str().is_empty() {
                    to.to_path_buf()
                } else {
                    to.join(relative)
                };
                nodes.insert(target, node);
            }
        }
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.nodes.lock().get(path) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            Some(Node::Directory) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut nodes = self.nodes.lock();
        if !Self::parent_is_directory(&nodes, path) {
            return Err(not_found(path));
        }
        if matches!(nodes.get(path), Some(Node::Directory)) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("is a directory: {}", path.display()),
            ));
        }
        nodes.insert(path.to_path_buf(), Node::File(contents.to_vec()));
        Ok(())
    }
}
