//! # Deployment Construction
//!
//! Shared Deployment shape for both charts: metadata, labels, a single
//! container, and resource pass-through.

use crate::{ChartKind, RenderError, RenderOptions, Result, MAX_LABEL_LENGTH};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use metric_charts_values::ImageValues;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use tracing::debug;

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_VERSION: &str = "app.kubernetes.io/version";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "metric-charts";

/// Everything that differs between the two charts' Deployments
pub struct ContainerSpec<'a> {
    pub kind: ChartKind,
    pub replicas: u32,
    pub image: &'a ImageValues,
    pub env: Vec<EnvVar>,
    pub ports: Vec<ContainerPort>,
    pub resources: Option<&'a Value>,
}

/// Build the Deployment for one chart
pub fn build_deployment(spec: ContainerSpec<'_>, options: &RenderOptions) -> Result<Deployment> {
    let name = spec.kind.name();
    let labels = chart_labels(spec.kind, spec.image, options);

    let replicas = i32::try_from(spec.replicas)
        .map_err(|_| RenderError::invalid_value("replicaCount", "exceeds the Kubernetes limit"))?;

    let resources = spec.resources.map(resource_requirements).transpose()?;

    let container = Container {
        name: name.to_string(),
        image: Some(spec.image.reference()),
        image_pull_policy: Some(spec.image.pull_policy.as_str().to_string()),
        ports: (!spec.ports.is_empty()).then_some(spec.ports),
        env: (!spec.env.is_empty()).then_some(spec.env),
        resources,
        ..Default::default()
    };

    let pod_template = PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels.clone()),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![container],
            ..Default::default()
        }),
    };

    let deployment_spec = DeploymentSpec {
        replicas: Some(replicas),
        selector: LabelSelector {
            match_labels: Some(selector_labels(spec.kind, options)),
            ..Default::default()
        },
        template: pod_template,
        ..Default::default()
    };

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: options.namespace.clone(),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(deployment_spec),
        ..Default::default()
    })
}

/// `name`/`value` environment entry
pub fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    }
}

/// Labels matched by the selector; must stay stable across upgrades
pub fn selector_labels(kind: ChartKind, options: &RenderOptions) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), kind.name().to_string()),
        (LABEL_INSTANCE.to_string(), options.instance_for(kind)),
    ])
}

/// Labels on the Deployment and its pods
pub fn chart_labels(
    kind: ChartKind,
    image: &ImageValues,
    options: &RenderOptions,
) -> BTreeMap<String, String> {
    let mut labels = selector_labels(kind, options);
    labels.insert(LABEL_MANAGED_BY.to_string(), MANAGED_BY.to_string());

    if is_label_value(&image.tag) {
        labels.insert(LABEL_VERSION.to_string(), image.tag.clone());
    } else {
        debug!(
            "Image tag '{}' is not a valid label value, omitting {}",
            image.tag, LABEL_VERSION
        );
    }

    labels
}

/// Kubernetes label value: at most 63 of `[A-Za-z0-9._-]`, alphanumeric at both ends
fn is_label_value(value: &str) -> bool {
    let valid_chars = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.';
    let alnum_ends = value.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && value.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());

    value.len() <= MAX_LABEL_LENGTH && alnum_ends && value.chars().all(valid_chars)
}

/// Convert the `resources` values map into `ResourceRequirements`
///
/// Only `requests`, `limits` and `claims` are accepted. Numeric
/// quantities such as `cpu: 1` become their text form.
pub fn resource_requirements(value: &Value) -> Result<ResourceRequirements> {
    let Value::Mapping(mapping) = value else {
        return Err(RenderError::invalid_value("resources", "expected a mapping"));
    };

    let mut normalized = Mapping::new();
    for (key, section) in mapping {
        let Some(name) = key.as_str() else {
            return Err(RenderError::invalid_value("resources", "keys must be strings"));
        };

        let section = match name {
            "requests" | "limits" => normalize_quantities(name, section)?,
            "claims" => section.clone(),
            other => {
                return Err(RenderError::invalid_value(
                    format!("resources.{}", other),
                    "unknown key, expected requests, limits or claims",
                ))
            }
        };
        normalized.insert(key.clone(), section);
    }

    serde_yaml::from_value(Value::Mapping(normalized))
        .map_err(|e| RenderError::invalid_value("resources", e.to_string()))
}

fn normalize_quantities(section_name: &str, section: &Value) -> Result<Value> {
    let quantities = match section {
        Value::Null => return Ok(Value::Null),
        Value::Mapping(quantities) => quantities,
        _ => {
            return Err(RenderError::invalid_value(
                format!("resources.{}", section_name),
                "expected a mapping of resource quantities",
            ))
        }
    };

    let mut normalized = Mapping::new();
    for (resource, quantity) in quantities {
        let path = format!(
            "resources.{}.{}",
            section_name,
            resource.as_str().unwrap_or("?")
        );
        let text = match quantity {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                return Err(RenderError::invalid_value(
                    path,
                    "expected a quantity such as 100m or 128Mi",
                ))
            }
        };
        normalized.insert(resource.clone(), Value::String(text));
    }
    Ok(Value::Mapping(normalized))
}
