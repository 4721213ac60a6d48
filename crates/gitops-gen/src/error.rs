use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for callers that drive the whole pipeline.
#[derive(Error, Debug)]
pub enum GitopsGenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generate(#[from] GenError),

    #[error(transparent)]
    Sync(#[from] crate::gitops::SyncError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in '{path}': {message}")]
    ParseYaml { path: PathBuf, message: String },

    #[error("Failed to parse JSON in '{path}': {message}")]
    ParseJson { path: PathBuf, message: String },

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Errors raised by a [`Filesystem`](crate::storage::Filesystem) provider.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to MkDirAll '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),

    #[error("failed to {operation} '{path}': read-only file system")]
    ReadOnly {
        operation: &'static str,
        path: PathBuf,
    },
}

impl StorageError {
    /// Returns true when the failure came from a read-only provider.
    pub fn is_read_only(&self) -> bool {
        matches!(self, StorageError::ReadOnly { .. })
    }
}

/// Errors raised while synthesizing manifests and kustomization files.
#[derive(Error, Debug)]
pub enum GenError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to unmarshal kustomization file '{path}': {message}")]
    ParseKustomization { path: PathBuf, message: String },

    #[error("failed to unmarshal manifest '{path}': {message}")]
    ParseManifest { path: PathBuf, message: String },

    #[error("failed to marshal YAML: {0}")]
    SerializeYaml(#[from] serde_yaml::Error),

    #[error("base deployment '{0}' does not declare any container")]
    MissingContainer(PathBuf),
}

pub type Result<T> = std::result::Result<T, GenError>;
