#![allow(dead_code)]

use gitops_gen::resources::{Deployment, Ingress, ObjectMeta, Route, Service};
use gitops_gen::GeneratorOptions;

pub const COMPONENT: &str = "web";
pub const APPLICATION: &str = "shop";

/// Options for a component with a container image and, when `port` is not
/// zero, a target port.
pub fn component(port: i32) -> GeneratorOptions {
    GeneratorOptions {
        name: COMPONENT.to_string(),
        namespace: "shop-dev".to_string(),
        application: APPLICATION.to_string(),
        container_image: Some("quay.io/shop/web:1".to_string()),
        target_port: port,
        ..Default::default()
    }
}

pub fn deployment(name: &str) -> Deployment {
    Deployment::new(ObjectMeta::new(name), Default::default())
}

pub fn service(name: &str) -> Service {
    Service::new(ObjectMeta::new(name), Default::default())
}

pub fn route(name: &str) -> Route {
    Route::new(ObjectMeta::new(name), Default::default())
}

pub fn ingress(name: &str) -> Ingress {
    Ingress::new(ObjectMeta::new(name))
}

pub fn config_map(name: &str) -> serde_yaml::Value {
    serde_yaml::from_str(&format!(
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {name}\n"
    ))
    .unwrap()
}
