//! # Manifests
//!
//! Rendered Deployments and their text forms

use crate::{ChartKind, RenderError, Result};
use k8s_openapi::api::apps::v1::Deployment;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Output format for rendered manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestFormat {
    #[default]
    Yaml,
    Json,
}

impl ManifestFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ManifestFormat::Yaml => "yaml",
            ManifestFormat::Json => "json",
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ManifestFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "yaml" | "yml" => Ok(ManifestFormat::Yaml),
            "json" => Ok(ManifestFormat::Json),
            other => Err(format!("unknown manifest format '{}'", other)),
        }
    }
}

/// A rendered chart
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub kind: ChartKind,
    pub deployment: Deployment,
}

impl Manifest {
    pub fn new(kind: ChartKind, deployment: Deployment) -> Self {
        Self { kind, deployment }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// File name used when writing into an output directory
    pub fn file_name(&self, format: ManifestFormat) -> String {
        format!("{}.{}", self.name(), format.extension())
    }

    /// Template path shown in the `# Source:` comment of YAML output
    pub fn source(&self) -> String {
        format!("{}/templates/deployment.yaml", self.name())
    }

    /// YAML form, with strings a YAML 1.1 reader would retype single-quoted
    pub fn to_yaml(&self) -> Result<String> {
        crate::yaml::to_string(&self.deployment).map_err(|e| RenderError::Serialize {
            chart: self.name().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.deployment).map_err(|e| RenderError::Serialize {
            chart: self.name().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn to_text(&self, format: ManifestFormat) -> Result<String> {
        match format {
            ManifestFormat::Yaml => Ok(format!("---\n# Source: {}\n{}", self.source(), self.to_yaml()?)),
            ManifestFormat::Json => self.to_json(),
        }
    }

    /// Re-parse the YAML form and check it yields this exact Deployment
    pub fn verify(&self) -> Result<()> {
        let parsed = verify_manifest(&self.to_yaml()?)?;
        match parsed.as_slice() {
            [deployment] if *deployment == self.deployment => Ok(()),
            [_] => Err(RenderError::InvalidManifest {
                chart: self.name().to_string(),
                reason: "manifest does not round-trip through YAML".to_string(),
            }),
            other => Err(RenderError::InvalidManifest {
                chart: self.name().to_string(),
                reason: format!("expected one document, found {}", other.len()),
            }),
        }
    }
}

/// Join manifests into one text stream
///
/// YAML output is a multi-document stream; JSON output is a single object,
/// or a `List` when there is more than one manifest.
pub fn render_documents(manifests: &[Manifest], format: ManifestFormat) -> Result<String> {
    match format {
        ManifestFormat::Yaml => {
            let mut out = String::new();
            for manifest in manifests {
                out.push_str(&manifest.to_text(ManifestFormat::Yaml)?);
            }
            Ok(out)
        }
        ManifestFormat::Json => match manifests {
            [single] => single.to_json(),
            many => {
                let list = serde_json::json!({
                    "apiVersion": "v1",
                    "kind": "List",
                    "items": many.iter().map(|m| &m.deployment).collect::<Vec<_>>(),
                });
                serde_json::to_string_pretty(&list).map_err(|e| RenderError::Serialize {
                    chart: "list".to_string(),
                    reason: e.to_string(),
                })
            }
        },
    }
}

/// Parse rendered YAML back into Deployments and sanity-check each one
pub fn verify_manifest(text: &str) -> Result<Vec<Deployment>> {
    let mut deployments = Vec::new();

    for document in serde_yaml::Deserializer::from_str(text) {
        let deployment = Deployment::deserialize(document).map_err(|e| RenderError::InvalidManifest {
            chart: "unknown".to_string(),
            reason: e.to_string(),
        })?;
        check_deployment(&deployment)?;
        deployments.push(deployment);
    }

    if deployments.is_empty() {
        return Err(RenderError::InvalidManifest {
            chart: "unknown".to_string(),
            reason: "no documents found".to_string(),
        });
    }

    Ok(deployments)
}

fn check_deployment(deployment: &Deployment) -> Result<()> {
    let name = deployment.metadata.name.clone().unwrap_or_default();
    let invalid = |reason: &str| RenderError::InvalidManifest {
        chart: if name.is_empty() { "unknown".to_string() } else { name.clone() },
        reason: reason.to_string(),
    };

    if name.parse::<ChartKind>().is_err() {
        return Err(invalid("metadata.name is not a known chart"));
    }

    let spec = deployment.spec.as_ref().ok_or_else(|| invalid("missing spec"))?;
    if spec.replicas.unwrap_or(0) < 1 {
        return Err(invalid("spec.replicas must be at least 1"));
    }

    let pod_spec = spec
        .template
        .spec
        .as_ref()
        .ok_or_else(|| invalid("missing spec.template.spec"))?;
    let container = pod_spec
        .containers
        .first()
        .ok_or_else(|| invalid("no containers"))?;
    if container.image.as_deref().map_or(true, str::is_empty) {
        return Err(invalid("container image is empty"));
    }

    let selector = spec.selector.match_labels.clone().unwrap_or_default();
    let pod_labels = spec
        .template
        .metadata
        .as_ref()
        .and_then(|m| m.labels.clone())
        .unwrap_or_default();
    if selector.is_empty() || selector.iter().any(|(k, v)| pod_labels.get(k) != Some(v)) {
        return Err(invalid("selector does not match pod template labels"));
    }

    Ok(())
}
