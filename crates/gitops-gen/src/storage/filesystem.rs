//! [`Filesystem`] backed by the local disk.
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! reader never sees a half-written manifest.

use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{DirEntry, Filesystem};
use crate::error::StorageError;

/// Disk-backed [`Filesystem`].
///
/// Relative paths are resolved against `root` when one is set, otherwise
/// against the process working directory.
#[derive(Debug, Clone, Default)]
pub struct DiskFs {
    root: Option<PathBuf>,
}

impl DiskFs {
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Creates a provider that resolves relative paths under `root`.
    pub fn rooted<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Filesystem for DiskFs {
    fn mkdir_all(&self, path: &Path) -> Result<(), StorageError> {
        let path = self.resolve(path);
        std::fs::create_dir_all(&path).map_err(|e| StorageError::CreateDirectory {
            path: path.clone(),
            source: e,
        })
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(path);
        let write_error = |e: std::io::Error| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        };

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut file = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
        file.write_all(contents).map_err(write_error)?;
        // temp files start out owner-only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))
                .map_err(write_error)?;
        }
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(&path).map_err(|e| write_error(e.error))?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(path);
        std::fs::read(&path).map_err(|e| StorageError::ReadFile {
            path: path.clone(),
            source: e,
        })
    }

    fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        let path = self.resolve(path);
        // symlink_metadata so broken symlinks still count as present
        match std::fs::symlink_metadata(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::ReadFile { path, source: e }),
        }
    }

    fn temp_dir(&self, prefix: &str) -> Result<PathBuf, StorageError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);
        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(StorageError::TempDir)?;

        // The caller owns the directory from here on.
        let path = dir.keep();
        log::debug!("Created temporary directory {}", path.display());
        Ok(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, StorageError> {
        let path = self.resolve(path);
        let mut entries = Vec::new();

        for entry in WalkDir::new(&path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| StorageError::ReadDirectory {
                path: path.clone(),
                source: e.into(),
            })?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().is_dir(),
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let fs = DiskFs::new();
        let nested = dir.path().join("a/b");

        fs.mkdir_all(&nested).unwrap();
        fs.write_file(&nested.join("file.yaml"), b"kind: Test\n").unwrap();

        assert!(fs.exists(&nested.join("file.yaml")).unwrap());
        assert_eq!(fs.read_file(&nested.join("file.yaml")).unwrap(), b"kind: Test\n");
    }

    #[test]
    fn test_write_replaces_atomically() {
        let dir = TempDir::new().unwrap();
        let fs = DiskFs::new();
        let target = dir.path().join("kustomization.yaml");

        fs.write_file(&target, b"resources:\n- a.yaml\n").unwrap();
        fs.write_file(&target, b"resources:\n- b.yaml\n").unwrap();

        assert_eq!(fs.read_file(&target).unwrap(), b"resources:\n- b.yaml\n");
        let names: Vec<_> = fs
            .read_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["kustomization.yaml"]);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing/deployment.yaml");

        let err = DiskFs::new().write_file(&target, b"kind: Deployment\n").unwrap_err();
        assert!(matches!(err, StorageError::WriteFile { .. }));
        assert!(err.to_string().contains("missing/deployment.yaml"));
    }

    #[test]
    fn test_rooted_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let fs = DiskFs::rooted(dir.path());

        fs.mkdir_all(Path::new("components")).unwrap();
        assert!(dir.path().join("components").is_dir());
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let fs = DiskFs::new();
        let missing = dir.path().join("missing.yaml");

        let err = fs.read_file(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
        assert!(!fs.exists(&missing).unwrap());
    }

    #[test]
    fn test_read_dir_sorted() {
        let dir = TempDir::new().unwrap();
        let fs = DiskFs::new();
        fs.mkdir_all(&dir.path().join("zeta")).unwrap();
        fs.mkdir_all(&dir.path().join("alpha")).unwrap();
        fs.write_file(&dir.path().join("kustomization.yaml"), b"").unwrap();

        let entries = fs.read_dir(dir.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "kustomization.yaml", "zeta"]);
        assert!(entries[0].is_dir);
        assert!(!entries[1].is_dir);
    }

    #[test]
    fn test_temp_dir_is_kept() {
        let dir = TempDir::new().unwrap();
        let fs = DiskFs::rooted(dir.path());

        let tmp = fs.temp_dir("gitops").unwrap();
        assert!(tmp.is_dir());
        assert!(tmp
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("gitops"));
    }
}
