pub mod config;
pub mod error;
pub mod generate;
pub mod gitops;
pub mod options;
pub mod resources;
pub mod sanitize;
pub mod storage;

pub use config::{load_options, load_settings, SyncSettings};
pub use error::{ConfigError, GenError, GitopsGenError, Result, StorageError};
pub use generate::{generate, generate_overlays, generate_parent_kustomize, Manifest};
pub use gitops::{
    CmdExecutor, CommandExecutor, GitopsGen, OverlayTarget, RepoCreator, ScriptedExecutor,
    SyncError, SyncOutcome,
};
pub use options::{GeneratedResources, GeneratorOptions, KubernetesResources};
pub use resources::Kustomization;
pub use sanitize::{sanitize_error_message, validate_remote, InvalidRemote};
pub use storage::{DiskFs, Filesystem, MemoryFs, ReadOnlyFs};
