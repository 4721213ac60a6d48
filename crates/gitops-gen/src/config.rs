//! Settings for one synchronization run and loading of generator options.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, StorageError};
use crate::options::GeneratorOptions;
use crate::sanitize::{redact_repo_url, validate_remote};
use crate::storage::Filesystem;

/// Name prefix of the per-run clone directory.
pub const RUN_DIR_PREFIX: &str = "gitops-gen-";

/// Where and how generated manifests are pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// Remote URL, usually `https://<token>@host/org/repo`.
    #[serde(default)]
    pub remote: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    /// Directory inside the repository that holds the GitOps tree.
    #[serde(default = "default_context")]
    pub context: String,

    #[serde(default = "default_true")]
    pub do_push: bool,

    /// Directory repositories are cloned into.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Value for the `app.kubernetes.io/created-by` label when the options
    /// do not set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_context() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

fn default_work_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("gitops-gen")
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            remote: String::new(),
            branch: default_branch(),
            context: default_context(),
            do_push: default_true(),
            work_dir: default_work_dir(),
            created_by: None,
        }
    }
}

impl SyncSettings {
    /// Checks the settings before any command runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.branch.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "branch must not be empty".to_string(),
            });
        }
        if !self.remote.is_empty() && validate_remote(&self.remote).is_err() {
            return Err(ConfigError::Validation {
                message: format!("unsupported remote '{}'", redact_repo_url(&self.remote)),
            });
        }
        if self.context.split('/').any(|part| part == "..") {
            return Err(ConfigError::Validation {
                message: format!("context '{}' must stay inside the repository", self.context),
            });
        }
        Ok(())
    }

    /// Whether `work_dir` was left at its default.
    pub fn has_default_work_dir(&self) -> bool {
        self.work_dir == default_work_dir()
    }

    /// Points `work_dir` at a fresh directory owned by this run, so
    /// repeated runs never clone into a directory left behind by an
    /// earlier one.
    pub fn use_run_dir<F: Filesystem + ?Sized>(&mut self, fs: &F) -> Result<&Path, StorageError> {
        self.work_dir = fs.temp_dir(RUN_DIR_PREFIX)?;
        log::debug!("Using run directory {}", self.work_dir.display());
        Ok(&self.work_dir)
    }

    /// GitOps directory inside a cloned repository.
    pub fn gitops_folder(&self, repo_path: &Path) -> PathBuf {
        let context = self.context.trim_matches('/');
        if context.is_empty() {
            repo_path.to_path_buf()
        } else {
            repo_path.join(context)
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Loads and validates [`SyncSettings`] from a YAML file.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<SyncSettings, ConfigError> {
    let path = path.as_ref();
    let content = read(path)?;

    let settings: SyncSettings = if content.trim().is_empty() {
        SyncSettings::default()
    } else {
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };

    settings.validate()?;
    log::debug!("Loaded sync settings from {}", path.display());
    Ok(settings)
}

/// Loads [`GeneratorOptions`] from a YAML file, or JSON when the extension
/// is `.json`.
pub fn load_options<P: AsRef<Path>>(path: P) -> Result<GeneratorOptions, ConfigError> {
    let path = path.as_ref();
    let content = read(path)?;

    let options: GeneratorOptions = if is_json(path) {
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseJson {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };

    if options.name.is_empty() {
        return Err(ConfigError::Validation {
            message: format!("'{}' does not set a component name", path.display()),
        });
    }

    Ok(options)
}
