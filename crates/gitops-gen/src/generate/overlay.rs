//! Per-environment Deployment patches.

use std::path::{Path, PathBuf};
use tracing::instrument;

use super::{DEPLOYMENT_FILE, DEPLOYMENT_PATCH_FILE, KUSTOMIZATION_FILE};
use crate::error::{GenError, Result};
use crate::options::{GeneratedResources, GeneratorOptions};
use crate::resources::k8s::{PodSpec, PodTemplateSpec};
use crate::resources::{
    Container, Deployment, DeploymentSpec, EnvVar, Kustomization, ObjectMeta,
};
use crate::storage::{normalize_path, Filesystem};

/// Base directory as seen from an overlay directory.
pub const BASE_RELATIVE_PATH: &str = "../../base";

/// Location of the base Deployment for an overlay folder.
pub fn base_deployment_path(output_folder: &Path) -> PathBuf {
    normalize_path(&output_folder.join(BASE_RELATIVE_PATH).join(DEPLOYMENT_FILE))
}

/// Applies `overrides` on top of `base`, last write wins per name.
///
/// An override with a known name replaces that entry in place. New names
/// are appended in override order.
pub fn merge_env(base: &[EnvVar], overrides: &[EnvVar]) -> Vec<EnvVar> {
    let mut merged = base.to_vec();
    for var in overrides {
        match merged.iter_mut().find(|existing| existing.name == var.name) {
            Some(existing) => *existing = var.clone(),
            None => merged.push(var.clone()),
        }
    }
    merged
}

fn read_base_container_name<F: Filesystem + ?Sized>(fs: &F, path: &Path) -> Result<String> {
    let bytes = fs.read_file(path)?;
    let deployment: Deployment =
        serde_yaml::from_slice(&bytes).map_err(|e| GenError::ParseManifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    deployment
        .spec
        .template
        .spec
        .containers
        .into_iter()
        .next()
        .map(|c| c.name)
        .ok_or_else(|| GenError::MissingContainer(path.to_path_buf()))
}

/// Builds the strategic-merge patch for one environment.
pub fn generate_deployment_patch(
    options: &GeneratorOptions,
    container_name: &str,
    image: &str,
    namespace: &str,
) -> Deployment {
    let container = Container {
        name: container_name.to_string(),
        image: Some(image.to_string()),
        env: merge_env(&options.base_env_var, &options.overlay_env_var),
        resources: options.resources.clone(),
        ..Default::default()
    };

    let metadata = ObjectMeta {
        name: options.name.clone(),
        namespace: namespace.to_string(),
        ..Default::default()
    };

    Deployment::new(
        metadata,
        DeploymentSpec {
            replicas: Some(options.effective_replicas()),
            selector: None,
            template: PodTemplateSpec {
                metadata: None,
                spec: PodSpec {
                    containers: vec![container],
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        },
    )
}

/// Writes `deployment-patch.yaml` and reconciles the overlay kustomization.
///
/// Patch files previously recorded for the component in
/// `generated_resources` are treated as tool-managed alongside the new
/// patch. Entries already in the kustomization keep their order.
#[instrument(skip_all, fields(
    component = %options.name,
    gitops_root = %gitops_root.display(),
    output = %output_folder.display(),
))]
pub fn generate_overlays<F: Filesystem + ?Sized>(
    fs: &F,
    gitops_root: &Path,
    output_folder: &Path,
    options: &GeneratorOptions,
    image: &str,
    namespace: &str,
    generated_resources: &GeneratedResources,
) -> Result<()> {
    let container_name = read_base_container_name(fs, &base_deployment_path(output_folder))?;
    let patch = generate_deployment_patch(options, &container_name, image, namespace);

    fs.mkdir_all(output_folder)?;
    fs.write_file(
        &output_folder.join(DEPLOYMENT_PATCH_FILE),
        serde_yaml::to_string(&patch)?.as_bytes(),
    )?;

    let kustomization_path = output_folder.join(KUSTOMIZATION_FILE);
    let mut kustomization =
        Kustomization::load(fs, &kustomization_path)?.unwrap_or_else(Kustomization::new);
    let original = std::mem::take(&mut kustomization.patches);

    let mut generated = vec![DEPLOYMENT_PATCH_FILE.to_string()];
    if let Some(recorded) = generated_resources.get(&options.name) {
        generated.extend(recorded.iter().cloned());
    }

    kustomization.add_bases([BASE_RELATIVE_PATH]);
    kustomization.merge_patches(&original, &generated);
    kustomization.write(fs, &kustomization_path)?;

    tracing::debug!(patches = ?kustomization.patch_paths(), "Wrote overlay kustomization");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_deployment_path() {
        assert_eq!(
            base_deployment_path(Path::new("/repo/components/web/overlays/dev")),
            PathBuf::from("/repo/components/web/base/deployment.yaml")
        );
    }

    #[test]
    fn test_merge_env_last_write_wins() {
        let base = vec![EnvVar::new("A", "1"), EnvVar::new("B", "2")];
        let overrides = vec![EnvVar::new("C", "3"), EnvVar::new("A", "9")];

        assert_eq!(
            merge_env(&base, &overrides),
            vec![EnvVar::new("A", "9"), EnvVar::new("B", "2"), EnvVar::new("C", "3")]
        );
    }

    #[test]
    fn test_patch_shape() {
        let options = GeneratorOptions {
            name: "web".into(),
            replicas: 0,
            ..Default::default()
        };
        let patch = generate_deployment_patch(&options, "container-image", "img:2", "shop-prod");

        assert_eq!(patch.metadata.namespace, "shop-prod");
        assert_eq!(patch.spec.replicas, Some(1));
        assert!(patch.spec.selector.is_none());
        let container = &patch.spec.template.spec.containers[0];
        assert_eq!(container.name, "container-image");
        assert_eq!(container.image.as_deref(), Some("img:2"));
    }
}
