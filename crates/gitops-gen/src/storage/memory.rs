//! In-memory and read-only [`Filesystem`] providers for tests and dry runs.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{normalize_path, DirEntry, Filesystem};
use crate::error::StorageError;

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// [`Filesystem`] kept entirely in memory.
///
/// Paths are normalized and anchored at `/`, so `a/b` and `/a/./b` address
/// the same entry.
#[derive(Debug)]
pub struct MemoryFs {
    nodes: Mutex<BTreeMap<PathBuf, Node>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(PathBuf::from("/"), Node::Dir);
        Self {
            nodes: Mutex::new(nodes),
        }
    }

    fn key(path: &Path) -> PathBuf {
        normalize_path(&Path::new("/").join(path))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        // A poisoned map is still structurally valid.
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn not_found(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, what.to_string())
}

impl Filesystem for MemoryFs {
    fn mkdir_all(&self, path: &Path) -> Result<(), StorageError> {
        let key = Self::key(path);
        let mut nodes = self.lock();

        let mut current = PathBuf::new();
        for component in key.components() {
            current.push(component);
            match nodes.get(&current) {
                Some(Node::File(_)) => {
                    return Err(StorageError::CreateDirectory {
                        path: key.clone(),
                        source: io::Error::new(
                            io::ErrorKind::AlreadyExists,
                            format!("'{}' is a file", current.display()),
                        ),
                    });
                }
                Some(Node::Dir) => {}
                None => {
                    nodes.insert(current.clone(), Node::Dir);
                }
            }
        }

        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let key = Self::key(path);
        let mut nodes = self.lock();

        let parent_is_dir = key
            .parent()
            .map(|parent| matches!(nodes.get(parent), Some(Node::Dir)))
            .unwrap_or(false);
        if !parent_is_dir {
            return Err(StorageError::WriteFile {
                path: key,
                source: not_found("parent directory does not exist"),
            });
        }
        if matches!(nodes.get(&key), Some(Node::Dir)) {
            return Err(StorageError::WriteFile {
                path: key,
                source: io::Error::new(io::ErrorKind::Other, "is a directory"),
            });
        }

        nodes.insert(key, Node::File(contents.to_vec()));
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        let key = Self::key(path);
        match self.lock().get(&key) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            Some(Node::Dir) => Err(StorageError::ReadFile {
                path: key,
                source: io::Error::new(io::ErrorKind::Other, "is a directory"),
            }),
            None => Err(StorageError::ReadFile {
                path: key,
                source: not_found("file does not exist"),
            }),
        }
    }

    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        Ok(self.lock().contains_key(&Self::key(path)))
    }

    fn temp_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        let dir = PathBuf::from("/tmp").join(format!("{}{}", prefix, uuid::Uuid::new_v4().simple()));
        self.mkdir_all(&dir)?;
        Ok(dir)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let key = Self::key(path);
        let nodes = self.lock();

        if !matches!(nodes.get(&key), Some(Node::Dir)) {
            return Err(StorageError::ReadDirectory {
                path: key,
                source: not_found("directory does not exist"),
            });
        }

        // BTreeMap order keeps the listing sorted by name.
        Ok(nodes
            .iter()
            .filter(|(candidate, _)| candidate.parent() == Some(key.as_path()))
            .filter_map(|(candidate, node)| {
                candidate.file_name().map(|name| DirEntry {
                    name: name.to_string_lossy().into_owned(),
                    is_dir: matches!(node, Node::Dir),
                })
            })
            .collect())
    }
}

/// Empty [`Filesystem`] that rejects every mutating call.
///
/// Reads see an empty tree. Used to exercise the write-failure paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadOnlyFs;

impl ReadOnlyFs {
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for ReadOnlyFs {
    fn mkdir_all(&self, path: &Path) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly {
            operation: "MkDirAll",
            path: path.to_path_buf(),
        })
    }

    fn write_file(&self, path: &Path, _contents: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly {
            operation: "WriteFile",
            path: path.to_path_buf(),
        })
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        Err(StorageError::ReadFile {
            path: path.to_path_buf(),
            source: not_found("file does not exist"),
        })
    }

    fn exists(&self, _path: &Path) -> Result<bool, StorageError> {
        Ok(false)
    }

    fn temp_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        Err(StorageError::ReadOnly {
            operation: "TempDir",
            path: PathBuf::from(prefix),
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        Err(StorageError::ReadDirectory {
            path: path.to_path_buf(),
            source: not_found("directory does not exist"),
        })
    }
}
