//! Repository synchronization error types.
//!
//! Every variant that can carry git output or a remote URL is built through
//! [`SyncError::from_command`] or [`SyncError::sanitized`], which run the
//! text through token sanitization before it is stored.

use std::path::PathBuf;
use thiserror::Error;

use super::exec::CommandError;
use crate::error::GenError;
use crate::sanitize::{sanitize_error_message, InvalidRemote};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    InvalidRemote(#[from] InvalidRemote),

    #[error("failed to clone git repository in {dir:?} {output:?}: {message}")]
    Clone {
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to checkout branch {branch:?} in repository {dir:?} {output:?}: {message}")]
    Checkout {
        branch: String,
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to delete {target:?} folder in repository in {dir:?} {output:?}: {message}")]
    Purge {
        target: String,
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to generate the gitops resources in {path:?} for component {component:?}: {message}")]
    Generate {
        path: PathBuf,
        component: String,
        message: String,
    },

    #[error("failed to generate the gitops resources in overlays dir {path:?} for component {component:?}: {message}")]
    GenerateOverlays {
        path: PathBuf,
        component: String,
        message: String,
    },

    #[error("failed to re-generate the gitops resources in {path:?} for component {component:?}: {message}")]
    RegenerateParent {
        path: PathBuf,
        component: String,
        message: String,
    },

    #[error("failed to add files for component {component:?} to repository in {dir:?} {output:?}: {message}")]
    Add {
        component: String,
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to check git diff in repository {dir:?} {output:?}: {message}")]
    Diff {
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to commit files to repository {dir:?} {output:?}: {message}")]
    Commit {
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to push remote to repository {remote:?} from {dir:?} {output:?}: {message}")]
    Push {
        remote: String,
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to initialize git repository in {dir:?} {output:?}: {message}")]
    Init {
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to switch to branch {branch:?} in repository in {dir:?} {output:?}: {message}")]
    RenameBranch {
        branch: String,
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to add remote 'origin' {remote:?} to repository in {dir:?} {output:?}: {message}")]
    AddRemote {
        remote: String,
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to retrieve commit id for repository in {dir:?} {output:?}: {message}")]
    CommitId {
        dir: PathBuf,
        output: String,
        message: String,
    },

    #[error("failed to parse GitOps repo URL {0:?}")]
    RepoUrl(String),

    #[error("failed to get the user with their auth token: {0}")]
    CurrentUser(String),

    #[error("failed to create repository, repo already exists")]
    RepoExists,

    #[error("failed to create repository {name:?} in namespace {namespace:?}: {message}")]
    CreateRepo {
        name: String,
        namespace: String,
        message: String,
    },
}

/// Sanitized `(output, message)` pair of a failed command.
pub(crate) struct Failure {
    pub output: String,
    pub message: String,
}

impl SyncError {
    /// Splits a command failure into sanitized output and message.
    pub(crate) fn from_command(err: &CommandError) -> Failure {
        Failure {
            output: sanitize_error_message(&String::from_utf8_lossy(err.output())),
            message: sanitize_error_message(&err.to_string()),
        }
    }

    /// Sanitizes free text that may echo a remote.
    pub(crate) fn sanitized(text: impl AsRef<str>) -> String {
        sanitize_error_message(text.as_ref())
    }

    /// Message of a generator failure, sanitized.
    pub(crate) fn generator_message(err: &GenError) -> String {
        sanitize_error_message(&err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
