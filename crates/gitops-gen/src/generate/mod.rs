//! Manifest synthesis and kustomization reconciliation.
//!
//! [`generate`] writes the base manifests of one component, [`overlay`]
//! writes per-environment patches on top of them and [`parent`] maintains
//! the kustomization that lists every component.

pub mod base;
pub mod overlay;
pub mod parent;

use serde::Serialize;
use std::path::Path;
use tracing::instrument;

use crate::error::Result;
use crate::options::GeneratorOptions;
use crate::resources::{Deployment, Ingress, Kustomization, Route, Service};
use crate::storage::Filesystem;

pub use overlay::generate_overlays;
pub use parent::{generate_parent_kustomize, update_parent_kustomize};

pub const DEPLOYMENT_FILE: &str = "deployment.yaml";
pub const SERVICE_FILE: &str = "service.yaml";
pub const ROUTE_FILE: &str = "route.yaml";
pub const OTHER_RESOURCES_FILE: &str = "other_resources.yaml";
pub const DEPLOYMENT_PATCH_FILE: &str = "deployment-patch.yaml";
pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

/// Line that terminates every document in the aggregate file.
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// One Kubernetes document ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Manifest {
    Deployment(Deployment),
    Service(Service),
    Route(Route),
    Ingress(Ingress),
    Other(serde_yaml::Value),
}

impl Manifest {
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl From<Deployment> for Manifest {
    fn from(value: Deployment) -> Self {
        Manifest::Deployment(value)
    }
}

impl From<Service> for Manifest {
    fn from(value: Service) -> Self {
        Manifest::Service(value)
    }
}

impl From<Route> for Manifest {
    fn from(value: Route) -> Self {
        Manifest::Route(value)
    }
}

impl From<Ingress> for Manifest {
    fn from(value: Ingress) -> Self {
        Manifest::Ingress(value)
    }
}

/// Where each base document goes.
#[derive(Debug, Default, PartialEq)]
pub struct Placement {
    /// Documents with their own fixed filename, in write order.
    pub canonical: Vec<(&'static str, Manifest)>,
    /// Documents folded into [`OTHER_RESOURCES_FILE`], in discovery order.
    pub aggregate: Vec<Manifest>,
}

impl Placement {
    /// Filenames this placement produces.
    pub fn file_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.canonical.iter().map(|(name, _)| *name).collect();
        if !self.aggregate.is_empty() {
            names.push(OTHER_RESOURCES_FILE);
        }
        names
    }
}

/// Decides which documents the component gets and where each one is written.
///
/// The first Deployment, Service and Route go to their canonical files.
/// Later instances follow in the aggregate, then every Ingress and every
/// other document. A Deployment is synthesized when none was supplied; a
/// Service and a Route are synthesized when none was supplied and the
/// target port is set.
pub fn classify(options: &GeneratorOptions) -> Placement {
    let explicit = &options.kubernetes_resources;

    let deployments = if explicit.deployments.is_empty() {
        vec![base::generate_deployment(options)]
    } else {
        explicit.deployments.clone()
    };

    let services = if explicit.services.is_empty() && options.target_port != 0 {
        vec![base::generate_service(options)]
    } else {
        explicit.services.clone()
    };

    let routes = if explicit.routes.is_empty() && options.target_port != 0 {
        vec![base::generate_route(options)]
    } else {
        explicit.routes.clone()
    };

    let mut placement = Placement::default();
    let mut overflow = Vec::new();

    place(DEPLOYMENT_FILE, deployments, &mut placement.canonical, &mut overflow);
    place(SERVICE_FILE, services, &mut placement.canonical, &mut overflow);
    place(ROUTE_FILE, routes, &mut placement.canonical, &mut overflow);

    placement.aggregate = overflow;
    placement
        .aggregate
        .extend(explicit.ingresses.iter().cloned().map(Manifest::from));
    placement
        .aggregate
        .extend(explicit.others.iter().cloned().map(Manifest::Other));

    placement
}

fn place<T: Into<Manifest>>(
    file: &'static str,
    items: Vec<T>,
    canonical: &mut Vec<(&'static str, Manifest)>,
    overflow: &mut Vec<Manifest>,
) {
    let mut items = items.into_iter().map(Into::into);
    if let Some(first) = items.next() {
        canonical.push((file, first));
    }
    overflow.extend(items);
}

/// Joins documents into one multi-document YAML string, each followed by
/// [`DOCUMENT_SEPARATOR`].
pub fn render_aggregate(documents: &[Manifest]) -> Result<String> {
    let mut out = String::new();
    for document in documents {
        out.push_str(&document.to_yaml()?);
        out.push_str(DOCUMENT_SEPARATOR);
    }
    Ok(out)
}

/// Writes the base manifests of one component into `output_folder`.
///
/// The folder gets the canonical files, the aggregate file when needed and
/// a `kustomization.yaml` listing exactly those files. When `root_folder` is
/// set, the kustomization there also gains `components/<name>/base`.
#[instrument(skip_all, fields(component = %options.name, output = %output_folder.display()))]
pub fn generate<F: Filesystem + ?Sized>(
    fs: &F,
    root_folder: Option<&Path>,
    output_folder: &Path,
    options: &GeneratorOptions,
) -> Result<()> {
    let placement = classify(options);

    fs.mkdir_all(output_folder)?;

    for (file, manifest) in &placement.canonical {
        fs.write_file(&output_folder.join(file), manifest.to_yaml()?.as_bytes())?;
    }
    if !placement.aggregate.is_empty() {
        let aggregate = render_aggregate(&placement.aggregate)?;
        fs.write_file(&output_folder.join(OTHER_RESOURCES_FILE), aggregate.as_bytes())?;
    }

    let mut kustomization = Kustomization::new();
    kustomization.add_resources(placement.file_names());
    kustomization.write(fs, &output_folder.join(KUSTOMIZATION_FILE))?;

    tracing::debug!(files = ?placement.file_names(), "Wrote base manifests");

    if let Some(root) = root_folder {
        update_parent_kustomize(fs, root, &options.name)?;
    }

    Ok(())
}
