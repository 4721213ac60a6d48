//! Clone, regenerate, commit and push.
//!
//! Every operation runs the same sequence of git commands through the
//! injected [`CommandExecutor`]:
//!
//! 1. `git clone <remote> <dir>` in the work directory
//! 2. `git switch <branch>`, falling back once to `git checkout -b <branch>`
//! 3. `rm -rf` of the subtree about to be regenerated
//! 4. regeneration through the injected [`Filesystem`]
//! 5. `git add .` and `git --no-pager diff --cached`
//! 6. `git commit -m <message>` and `git push origin <branch>`, skipped
//!    when the staged diff is empty
//!
//! Any failing step aborts the call. Nothing is retried.

use std::path::{Path, PathBuf};
use tracing::instrument;

use super::error::{Result, SyncError};
use super::exec::{CommandError, CommandExecutor, CommandKind};
use super::remote::{create_remote_repository, RepoCreator};
use crate::config::SyncSettings;
use crate::generate::{self, generate_overlays, generate_parent_kustomize, parent::COMPONENTS_DIR};
use crate::options::{GeneratedResources, GeneratorOptions};
use crate::sanitize::{redact_repo_url, validate_remote};
use crate::storage::Filesystem;

fn failed(
    build: impl FnOnce(String, String) -> SyncError,
) -> impl FnOnce(CommandError) -> SyncError {
    move |err| {
        let failure = SyncError::from_command(&err);
        build(failure.output, failure.message)
    }
}

/// How a synchronization call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A commit was created and pushed.
    Pushed,
    /// The staged diff was empty, so nothing was committed.
    NoChanges,
    /// Pushing was disabled for this call.
    NotPushed,
}

/// Environment-specific inputs of an overlay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayTarget {
    /// Application name, also the clone directory.
    pub application: String,
    pub environment: String,
    pub image: String,
    pub namespace: String,
}

/// Git synchronization driver.
pub struct GitopsGen<E, F> {
    executor: E,
    fs: F,
}

impl<E: CommandExecutor, F: Filesystem> GitopsGen<E, F> {
    pub fn new(executor: E, fs: F) -> Self {
        Self { executor, fs }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    fn git(&self, dir: &Path, args: &[&str]) -> std::result::Result<Vec<u8>, CommandError> {
        self.executor.execute(dir, CommandKind::Git, args)
    }

    /// Clones `remote` into `<output_path>/<dir_name>` and resolves `branch`.
    ///
    /// Returns the repository path.
    #[instrument(skip_all, fields(remote = %redact_repo_url(remote), branch = %branch))]
    pub fn clone_repo(
        &self,
        output_path: &Path,
        remote: &str,
        dir_name: &str,
        branch: &str,
    ) -> Result<PathBuf> {
        validate_remote(remote)?;

        self.git(output_path, &["clone", remote, dir_name])
            .map_err(failed(|output, message| SyncError::Clone {
                dir: output_path.to_path_buf(),
                output,
                message,
            }))?;

        let repo_path = output_path.join(dir_name);

        if let Err(switch_err) = self.git(&repo_path, &["switch", branch]) {
            tracing::debug!(error = %switch_err, "Branch not found, creating it");
            self.git(&repo_path, &["checkout", "-b", branch])
                .map_err(failed(|output, message| SyncError::Checkout {
                    branch: branch.to_string(),
                    dir: repo_path.clone(),
                    output,
                    message,
                }))?;
        }

        Ok(repo_path)
    }

    fn purge(&self, repo_path: &Path, target: &str) -> Result<()> {
        self.executor
            .execute(repo_path, CommandKind::Rm, &["-rf", target])
            .map_err(failed(|output, message| SyncError::Purge {
                target: target.to_string(),
                dir: repo_path.to_path_buf(),
                output,
                message,
            }))?;
        Ok(())
    }

    /// Regenerates the base manifests of one component and pushes them.
    ///
    /// `components/<name>/base` is deleted first, so files the new options
    /// no longer produce disappear from the repository.
    #[instrument(skip_all, fields(
        component = %options.name,
        remote = %redact_repo_url(&settings.remote),
        branch = %settings.branch,
    ))]
    pub fn clone_generate_and_push(
        &self,
        settings: &SyncSettings,
        options: &GeneratorOptions,
    ) -> Result<SyncOutcome> {
        let component = options.name.as_str();
        let repo_path =
            self.clone_repo(&settings.work_dir, &settings.remote, component, &settings.branch)?;

        let gitops_folder = settings.gitops_folder(&repo_path);
        let component_path = gitops_folder.join(COMPONENTS_DIR).join(component).join("base");

        // rm runs inside the clone, so the target is relative to it
        let relative = component_path
            .strip_prefix(&repo_path)
            .unwrap_or(&component_path)
            .to_string_lossy()
            .into_owned();
        self.purge(&repo_path, &relative)?;

        generate::generate(&self.fs, Some(&gitops_folder), &component_path, options).map_err(
            |e| SyncError::Generate {
                path: component_path.clone(),
                component: component.to_string(),
                message: SyncError::generator_message(&e),
            },
        )?;

        if !settings.do_push {
            return Ok(SyncOutcome::NotPushed);
        }
        self.commit_and_push(
            &repo_path,
            &settings.remote,
            component,
            &settings.branch,
            &format!("Generate GitOps base resources for component {component}"),
        )
    }

    /// Writes the overlay of one component for one environment and pushes
    /// it.
    ///
    /// With `clone` unset the repository is expected at
    /// `<work_dir>/<application>` already.
    #[instrument(skip_all, fields(
        component = %options.name,
        environment = %target.environment,
        branch = %settings.branch,
    ))]
    pub fn generate_overlays_and_push(
        &self,
        settings: &SyncSettings,
        clone: bool,
        options: &GeneratorOptions,
        target: &OverlayTarget,
        generated_resources: &GeneratedResources,
    ) -> Result<SyncOutcome> {
        let component = options.name.as_str();
        let repo_path = if clone {
            self.clone_repo(
                &settings.work_dir,
                &settings.remote,
                &target.application,
                &settings.branch,
            )?
        } else {
            settings.work_dir.join(&target.application)
        };

        let gitops_folder = settings.gitops_folder(&repo_path);
        let overlay_path = gitops_folder
            .join(COMPONENTS_DIR)
            .join(component)
            .join("overlays")
            .join(&target.environment);

        generate_overlays(
            &self.fs,
            &gitops_folder,
            &overlay_path,
            options,
            &target.image,
            &target.namespace,
            generated_resources,
        )
        .map_err(|e| SyncError::GenerateOverlays {
            path: overlay_path.clone(),
            component: component.to_string(),
            message: SyncError::generator_message(&e),
        })?;

        if !settings.do_push {
            return Ok(SyncOutcome::NotPushed);
        }
        self.commit_and_push(
            &repo_path,
            &settings.remote,
            component,
            &settings.branch,
            &format!(
                "Generate {} environment overlays for component {component}",
                target.environment
            ),
        )
    }

    /// Deletes a component and rebuilds the parent kustomization from what
    /// is left on disk.
    #[instrument(skip_all, fields(
        component = %component,
        remote = %redact_repo_url(&settings.remote),
        branch = %settings.branch,
    ))]
    pub fn remove_and_push(&self, settings: &SyncSettings, component: &str) -> Result<SyncOutcome> {
        let repo_path =
            self.clone_repo(&settings.work_dir, &settings.remote, component, &settings.branch)?;

        let gitops_folder = settings.gitops_folder(&repo_path);
        let component_path = gitops_folder.join(COMPONENTS_DIR).join(component);
        self.purge(&repo_path, &component_path.to_string_lossy())?;

        generate_parent_kustomize(&self.fs, &gitops_folder).map_err(|e| {
            SyncError::RegenerateParent {
                path: component_path.clone(),
                component: component.to_string(),
                message: SyncError::generator_message(&e),
            }
        })?;

        if !settings.do_push {
            return Ok(SyncOutcome::NotPushed);
        }
        self.commit_and_push(
            &repo_path,
            &settings.remote,
            component,
            &settings.branch,
            &format!("Removed component {component}"),
        )
    }

    /// Stages everything in `repo_path` and, when the staged diff is not
    /// empty, commits with `commit_message` and pushes `branch`.
    pub fn commit_and_push(
        &self,
        repo_path: &Path,
        remote: &str,
        component: &str,
        branch: &str,
        commit_message: &str,
    ) -> Result<SyncOutcome> {
        self.git(repo_path, &["add", "."])
            .map_err(failed(|output, message| SyncError::Add {
                component: component.to_string(),
                dir: repo_path.to_path_buf(),
                output,
                message,
            }))?;

        let diff = self
            .git(repo_path, &["--no-pager", "diff", "--cached"])
            .map_err(failed(|output, message| SyncError::Diff {
                dir: repo_path.to_path_buf(),
                output,
                message,
            }))?;

        if diff.is_empty() {
            tracing::info!(component = %component, "No changes to commit");
            return Ok(SyncOutcome::NoChanges);
        }

        self.git(repo_path, &["commit", "-m", commit_message])
            .map_err(failed(|output, message| SyncError::Commit {
                dir: repo_path.to_path_buf(),
                output,
                message,
            }))?;

        self.git(repo_path, &["push", "origin", branch])
            .map_err(failed(|output, message| SyncError::Push {
                remote: SyncError::sanitized(remote),
                dir: repo_path.to_path_buf(),
                output,
                message,
            }))?;

        tracing::info!(component = %component, branch = %branch, "Pushed changes");
        Ok(SyncOutcome::Pushed)
    }

    /// Bootstraps a new repository: generates into
    /// `<work_dir>/<application>`, creates the remote through `creator` and
    /// pushes the first commit.
    #[instrument(skip_all, fields(
        component = %options.name,
        remote = %redact_repo_url(&settings.remote),
    ))]
    pub fn generate_and_push<C: RepoCreator + ?Sized>(
        &self,
        settings: &SyncSettings,
        options: &GeneratorOptions,
        creator: &C,
    ) -> Result<SyncOutcome> {
        let component = options.name.as_str();
        let repo_path = settings.work_dir.join(&options.application);
        let component_path = repo_path.join(COMPONENTS_DIR).join(component).join("base");

        generate::generate(&self.fs, Some(&repo_path), &component_path, options).map_err(|e| {
            SyncError::Generate {
                path: component_path.clone(),
                component: component.to_string(),
                message: SyncError::generator_message(&e),
            }
        })?;

        if !settings.do_push {
            return Ok(SyncOutcome::NotPushed);
        }

        let remote = settings.remote.as_str();
        let branch = settings.branch.as_str();
        validate_remote(remote)?;
        create_remote_repository(creator, remote)?;

        self.git(&repo_path, &["init", "."])
            .map_err(failed(|output, message| SyncError::Init {
                dir: repo_path.clone(),
                output,
                message,
            }))?;
        self.git(&repo_path, &["add", "."])
            .map_err(failed(|output, message| SyncError::Add {
                component: component.to_string(),
                dir: repo_path.clone(),
                output,
                message,
            }))?;
        self.git(&repo_path, &["commit", "-m", "Generate GitOps resources"])
            .map_err(failed(|output, message| SyncError::Commit {
                dir: repo_path.clone(),
                output,
                message,
            }))?;
        self.git(&repo_path, &["branch", "-m", branch])
            .map_err(failed(|output, message| SyncError::RenameBranch {
                branch: branch.to_string(),
                dir: repo_path.clone(),
                output,
                message,
            }))?;
        self.git(&repo_path, &["remote", "add", "origin", remote])
            .map_err(failed(|output, message| SyncError::AddRemote {
                remote: SyncError::sanitized(remote),
                dir: repo_path.clone(),
                output,
                message,
            }))?;
        self.git(&repo_path, &["push", "-u", "origin", branch])
            .map_err(failed(|output, message| SyncError::Push {
                remote: SyncError::sanitized(remote),
                dir: repo_path.clone(),
                output,
                message,
            }))?;

        tracing::info!(component = %component, branch = %branch, "Pushed new repository");
        Ok(SyncOutcome::Pushed)
    }

    /// Commit the repository at `repo_path` currently points at.
    pub fn commit_id(&self, repo_path: &Path) -> Result<String> {
        let output = self
            .git(repo_path, &["rev-parse", "HEAD"])
            .map_err(failed(|output, message| SyncError::CommitId {
                dir: repo_path.to_path_buf(),
                output,
                message,
            }))?;
        Ok(String::from_utf8_lossy(&output).trim().to_string())
    }
}
