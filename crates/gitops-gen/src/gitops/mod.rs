//! Git synchronization of generated manifests.
//!
//! - [`exec`]: the command executor seam (`git`, `rm`)
//! - [`sync`]: the driver that clones, regenerates, commits and pushes
//! - [`remote`]: repository creation before the first push

pub mod error;
pub mod exec;
pub mod remote;
pub mod sync;

pub use error::{Result, SyncError};
pub use exec::{CmdExecutor, CommandError, CommandExecutor, CommandKind, Execution, ScriptedExecutor};
pub use remote::{create_remote_repository, HostingError, RepoCreator, RepositoryInput};
pub use sync::{GitopsGen, OverlayTarget, SyncOutcome};
