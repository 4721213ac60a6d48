//! Default Deployment, Service and Route for a component.

use crate::options::GeneratorOptions;
use crate::resources::k8s::{
    Container, ContainerPort, Extra, HttpGetAction, LabelSelector, LocalObjectReference, PodSpec,
    PodTemplateSpec, Probe, RoutePort, RouteTargetReference, ServicePort, TcpSocketAction,
    TlsConfig,
};
use crate::resources::{
    Deployment, DeploymentSpec, IntOrString, Labels, ObjectMeta, Route, RouteSpec, Service,
    ServiceSpec,
};

pub const CONTAINER_NAME: &str = "container-image";
pub const IMAGE_PULL_POLICY: &str = "Always";

const LABEL_NAME: &str = "app.kubernetes.io/name";
const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
const LABEL_PART_OF: &str = "app.kubernetes.io/part-of";
const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
const LABEL_CREATED_BY: &str = "app.kubernetes.io/created-by";

const PROBE_INITIAL_DELAY_SECONDS: i32 = 10;
const PROBE_PERIOD_SECONDS: i32 = 10;
const ROUTE_WEIGHT: i32 = 100;

/// Labels applied to every synthesized object.
///
/// `k8sLabels` wins when set; otherwise the standard five-key set is used.
pub fn labels(options: &GeneratorOptions) -> Labels {
    if !options.k8s_labels.is_empty() {
        return options.k8s_labels.clone();
    }

    Labels::from([
        (LABEL_NAME.to_string(), options.name.clone()),
        (LABEL_INSTANCE.to_string(), options.name.clone()),
        (LABEL_PART_OF.to_string(), options.application.clone()),
        (LABEL_MANAGED_BY.to_string(), "kustomize".to_string()),
        (LABEL_CREATED_BY.to_string(), options.created_by().to_string()),
    ])
}

/// Selector labels. Always the instance label alone, whatever [`labels`]
/// returns, so presentation labels can change without orphaning pods.
pub fn match_labels(options: &GeneratorOptions) -> Labels {
    Labels::from([(LABEL_INSTANCE.to_string(), options.name.clone())])
}

fn metadata(options: &GeneratorOptions) -> ObjectMeta {
    ObjectMeta {
        name: options.name.clone(),
        namespace: options.namespace.clone(),
        labels: labels(options),
        ..Default::default()
    }
}

pub fn generate_deployment(options: &GeneratorOptions) -> Deployment {
    let mut container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(options.container_image.clone().unwrap_or_default()),
        image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
        env: options.base_env_var.clone(),
        resources: options.resources.clone(),
        ..Default::default()
    };

    if options.target_port != 0 {
        let port = IntOrString::Int(options.target_port);
        container.ports = vec![ContainerPort {
            container_port: options.target_port,
            ..Default::default()
        }];
        container.readiness_probe = Some(Probe {
            tcp_socket: Some(TcpSocketAction {
                port: port.clone(),
                extra: Extra::new(),
            }),
            initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECONDS),
            period_seconds: Some(PROBE_PERIOD_SECONDS),
            ..Default::default()
        });
        container.liveness_probe = Some(Probe {
            http_get: Some(HttpGetAction {
                path: Some("/".to_string()),
                port,
                extra: Extra::new(),
            }),
            initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECONDS),
            period_seconds: Some(PROBE_PERIOD_SECONDS),
            ..Default::default()
        });
    }

    let image_pull_secrets = options
        .secret
        .iter()
        .filter(|s| !s.is_empty())
        .map(|name| LocalObjectReference {
            name: name.clone(),
            ..Default::default()
        })
        .collect();

    let spec = DeploymentSpec {
        replicas: Some(options.effective_replicas()),
        selector: Some(LabelSelector {
            match_labels: match_labels(options),
            ..Default::default()
        }),
        template: PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: match_labels(options),
                ..Default::default()
            }),
            spec: PodSpec {
                containers: vec![container],
                image_pull_secrets,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    };

    Deployment::new(metadata(options), spec)
}

pub fn generate_service(options: &GeneratorOptions) -> Service {
    let spec = ServiceSpec {
        ports: vec![ServicePort {
            port: options.target_port,
            target_port: Some(IntOrString::Int(options.target_port)),
            ..Default::default()
        }],
        selector: match_labels(options),
        ..Default::default()
    };

    Service::new(metadata(options), spec)
}

pub fn generate_route(options: &GeneratorOptions) -> Route {
    let spec = RouteSpec {
        host: options.route.clone().filter(|h| !h.is_empty()),
        port: Some(RoutePort {
            target_port: IntOrString::Int(options.target_port),
            extra: Extra::new(),
        }),
        tls: Some(TlsConfig {
            termination: "edge".to_string(),
            insecure_edge_termination_policy: Some("Redirect".to_string()),
            ..Default::default()
        }),
        to: RouteTargetReference {
            kind: "Service".to_string(),
            name: options.name.clone(),
            weight: Some(ROUTE_WEIGHT),
            ..Default::default()
        },
        ..Default::default()
    };

    Route::new(metadata(options), spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::EnvVar;

    fn options() -> GeneratorOptions {
        GeneratorOptions {
            name: "web".into(),
            namespace: "shop-dev".into(),
            application: "shop".into(),
            container_image: Some("quay.io/shop/web:1".into()),
            target_port: 8080,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_labels() {
        let labels = labels(&options());
        assert_eq!(labels.len(), 5);
        assert_eq!(labels[LABEL_PART_OF], "shop");
        assert_eq!(labels[LABEL_MANAGED_BY], "kustomize");
        assert_eq!(labels[LABEL_CREATED_BY], "application-service");
    }

    #[test]
    fn test_custom_labels_do_not_change_selector() {
        let mut options = options();
        options.k8s_labels = Labels::from([("team".to_string(), "a".to_string())]);

        let deployment = generate_deployment(&options);
        assert_eq!(deployment.metadata.labels, options.k8s_labels);
        assert_eq!(
            deployment.spec.selector.unwrap().match_labels,
            Labels::from([(LABEL_INSTANCE.to_string(), "web".to_string())])
        );
    }

    #[test]
    fn test_deployment_with_port() {
        let deployment = generate_deployment(&options());
        let container = &deployment.spec.template.spec.containers[0];

        assert_eq!(deployment.spec.replicas, Some(1));
        assert_eq!(container.name, CONTAINER_NAME);
        assert_eq!(container.image_pull_policy.as_deref(), Some("Always"));
        assert_eq!(container.ports[0].container_port, 8080);
        let readiness = container.readiness_probe.as_ref().unwrap();
        assert_eq!(readiness.initial_delay_seconds, Some(10));
        assert!(readiness.tcp_socket.is_some());
        let liveness = container.liveness_probe.as_ref().unwrap();
        assert_eq!(liveness.http_get.as_ref().unwrap().path.as_deref(), Some("/"));
    }

    #[test]
    fn test_deployment_without_port_has_no_probes() {
        let mut options = options();
        options.target_port = 0;
        options.container_image = None;
        options.base_env_var = vec![EnvVar::new("A", "1")];
        options.secret = Some("pull".into());
        options.replicas = 3;

        let deployment = generate_deployment(&options);
        let pod = &deployment.spec.template.spec;
        let container = &pod.containers[0];

        assert_eq!(deployment.spec.replicas, Some(3));
        assert_eq!(container.image.as_deref(), Some(""));
        assert!(container.ports.is_empty());
        assert!(container.readiness_probe.is_none());
        assert_eq!(container.env, vec![EnvVar::new("A", "1")]);
        assert_eq!(pod.image_pull_secrets[0].name, "pull");
    }

    #[test]
    fn test_service() {
        let service = generate_service(&options());
        assert_eq!(service.spec.ports[0].port, 8080);
        assert_eq!(service.spec.ports[0].target_port, Some(IntOrString::Int(8080)));
        assert_eq!(service.spec.selector, match_labels(&options()));
    }

    #[test]
    fn test_route_host_only_when_set() {
        let route = generate_route(&options());
        assert_eq!(route.spec.host, None);
        assert_eq!(route.spec.to.name, "web");
        assert_eq!(route.spec.to.weight, Some(100));
        let tls = route.spec.tls.unwrap();
        assert_eq!(tls.termination, "edge");
        assert_eq!(tls.insecure_edge_termination_policy.as_deref(), Some("Redirect"));

        let mut options = options();
        options.route = Some("web.example.com".into());
        assert_eq!(
            generate_route(&options).spec.host.as_deref(),
            Some("web.example.com")
        );
    }
}
