//! Typed documents the generators read and write.

pub mod k8s;
pub mod kustomization;

pub use k8s::{
    Container, Deployment, DeploymentSpec, EnvVar, Extra, Ingress, IntOrString, Labels, ObjectMeta,
    ResourceRequirements, Route, RouteSpec, Service, ServiceSpec,
};
pub use kustomization::{Kustomization, Patch, KUSTOMIZE_API_VERSION, KUSTOMIZE_KIND};
