//! Generator input.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::resources::{Deployment, EnvVar, Ingress, Labels, ResourceRequirements, Route, Service};

/// Label value used for `app.kubernetes.io/created-by` when
/// [`GeneratorOptions::created_by`] is unset.
pub const DEFAULT_CREATED_BY: &str = "application-service";

/// Explicit resources supplied instead of the synthesized defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KubernetesResources {
    pub deployments: Vec<Deployment>,
    pub services: Vec<Service>,
    pub routes: Vec<Route>,
    pub ingresses: Vec<Ingress>,
    /// Arbitrary documents written verbatim to the aggregate file.
    pub others: Vec<serde_yaml::Value>,
}

impl KubernetesResources {
    /// True when no resource of any kind was supplied.
    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
            && self.services.is_empty()
            && self.routes.is_empty()
            && self.ingresses.is_empty()
            && self.others.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GitSource {
    pub url: String,
}

/// Everything the generators need to describe one component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorOptions {
    /// Component name.
    pub name: String,
    pub namespace: String,
    /// Application the component belongs to.
    pub application: String,
    /// Route hostname, if any.
    pub route: Option<String>,
    pub container_image: Option<String>,
    pub target_port: i32,
    /// Image pull secret name.
    pub secret: Option<String>,
    pub replicas: i32,
    pub resources: ResourceRequirements,
    pub base_env_var: Vec<EnvVar>,
    pub overlay_env_var: Vec<EnvVar>,
    pub k8s_labels: Labels,
    pub kubernetes_resources: KubernetesResources,
    pub git_source: Option<GitSource>,
    /// Overrides the `app.kubernetes.io/created-by` label value.
    pub created_by: Option<String>,
}

impl GeneratorOptions {
    /// Replica count with the `max(1, replicas)` floor applied.
    pub fn effective_replicas(&self) -> i32 {
        self.replicas.max(1)
    }

    pub fn created_by(&self) -> &str {
        self.created_by
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CREATED_BY)
    }
}

/// Tool-generated patch filenames per component, owned by the caller and
/// carried across overlay invocations.
pub type GeneratedResources = HashMap<String, Vec<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_replicas_floor() {
        let mut options = GeneratorOptions::default();
        assert_eq!(options.effective_replicas(), 1);
        options.replicas = -3;
        assert_eq!(options.effective_replicas(), 1);
        options.replicas = 4;
        assert_eq!(options.effective_replicas(), 4);
    }

    #[test]
    fn test_created_by_default() {
        let mut options = GeneratorOptions::default();
        assert_eq!(options.created_by(), "application-service");
        options.created_by = Some("operator".into());
        assert_eq!(options.created_by(), "operator");
    }

    #[test]
    fn test_deserialize_camel_case() {
        let options: GeneratorOptions = serde_yaml::from_str(
            r#"
name: web
application: shop
containerImage: quay.io/shop/web:1
targetPort: 8080
k8sLabels:
  team: a
baseEnvVar:
- name: MODE
  value: prod
kubernetesResources:
  others:
  - apiVersion: v1
    kind: ConfigMap
    metadata:
      name: cfg
"#,
        )
        .unwrap();

        assert_eq!(options.name, "web");
        assert_eq!(options.target_port, 8080);
        assert_eq!(options.container_image.as_deref(), Some("quay.io/shop/web:1"));
        assert_eq!(options.k8s_labels.get("team").map(String::as_str), Some("a"));
        assert_eq!(options.base_env_var, vec![EnvVar::new("MODE", "prod")]);
        assert_eq!(options.kubernetes_resources.others.len(), 1);
        assert!(!options.kubernetes_resources.is_empty());
    }
}
