//! The kustomization at the GitOps root that lists every component base.
//!
//! Generation adds one entry to whatever is already there. Removal rebuilds
//! the list from the component directories left on disk, so entries that
//! point at nothing disappear.

use std::path::Path;
use tracing::instrument;

use super::KUSTOMIZATION_FILE;
use crate::error::Result;
use crate::resources::Kustomization;
use crate::storage::Filesystem;

pub const COMPONENTS_DIR: &str = "components";

/// Path of a component base relative to the GitOps root.
pub fn component_base_entry(component: &str) -> String {
    format!("{COMPONENTS_DIR}/{component}/base")
}

/// Adds `components/<component>/base` to the root kustomization, keeping
/// every existing entry.
pub fn update_parent_kustomize<F: Filesystem + ?Sized>(
    fs: &F,
    gitops_root: &Path,
    component: &str,
) -> Result<()> {
    let path = gitops_root.join(KUSTOMIZATION_FILE);

    fs.mkdir_all(gitops_root)?;
    let mut kustomization = Kustomization::load(fs, &path)?.unwrap_or_else(Kustomization::new);
    kustomization.add_resources([component_base_entry(component)]);
    kustomization.write(fs, &path)
}

/// Rewrites the root kustomization from the component bases found under
/// `<gitops_root>/components`.
///
/// A component counts only when its `base/kustomization.yaml` exists.
#[instrument(skip_all, fields(gitops_root = %gitops_root.display()))]
pub fn generate_parent_kustomize<F: Filesystem + ?Sized>(fs: &F, gitops_root: &Path) -> Result<()> {
    let components_dir = gitops_root.join(COMPONENTS_DIR);

    let mut entries = Vec::new();
    if fs.exists(&components_dir)? {
        for entry in fs.read_dir(&components_dir)? {
            if !entry.is_dir {
                continue;
            }
            let base = components_dir
                .join(&entry.name)
                .join("base")
                .join(KUSTOMIZATION_FILE);
            if fs.exists(&base)? {
                entries.push(component_base_entry(&entry.name));
            }
        }
    }

    tracing::debug!(components = entries.len(), "Rebuilt parent kustomization");

    let mut kustomization = Kustomization::new();
    kustomization.add_resources(entries);
    fs.mkdir_all(gitops_root)?;
    kustomization.write(fs, &gitops_root.join(KUSTOMIZATION_FILE))
}
