//! Filesystem providers used by the generators.
//!
//! Generators never touch `std::fs` directly; they go through
//! [`Filesystem`] so the same code runs against disk, an in-memory tree, or
//! a read-only tree that rejects every write.

pub mod filesystem;
pub mod memory;

use std::path::{Component, Path, PathBuf};

pub use filesystem::DiskFs;
pub use memory::{MemoryFs, ReadOnlyFs};

use crate::error::StorageError;

/// A single entry returned by [`Filesystem::read_dir`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    /// File name without any directory component.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Path-addressed tree the generators read from and write to.
pub trait Filesystem {
    /// Creates `path` and all missing parents.
    fn mkdir_all(&self, path: &Path) -> Result<(), StorageError>;

    /// Writes `contents` to `path`, replacing any existing file.
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError>;

    /// Reads the whole file at `path`.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, StorageError>;

    /// Returns whether anything exists at `path`.
    fn exists(&self, path: &Path) -> Result<bool, StorageError>;

    /// Creates a fresh, uniquely named directory and returns its path.
    fn temp_dir(&self, prefix: &str) -> Result<PathBuf, StorageError>;

    /// Lists the direct children of `path`, sorted by name.
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError>;
}

impl<F: Filesystem + ?Sized> Filesystem for &F {
    fn mkdir_all(&self, path: &Path) -> Result<(), StorageError> {
        (**self).mkdir_all(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        (**self).write_file(path, contents)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        (**self).read_file(path)
    }

    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        (**self).exists(path)
    }

    fn temp_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        (**self).temp_dir(prefix)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        (**self).read_dir(path)
    }
}

/// Resolves `.` and `..` components without touching the disk.
///
/// `..` above the root is dropped, so `/a/../../b` becomes `/b`.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if at_root {
                    if out.as_os_str().is_empty() {
                        out.push("..");
                    }
                } else if out.ends_with("..") {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
