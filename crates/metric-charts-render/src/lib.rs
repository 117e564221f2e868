//! # Metric Charts Renderer
//!
//! Renders the `metric-scraper` and `metric-pusher` Kubernetes Deployments
//! from chart values.
//!
//! Rendering is a pure function of the values and [`RenderOptions`]: the
//! same input always produces byte-identical manifests.
//!
//! ```rust,no_run
//! use metric_charts_render::{ChartKind, ManifestFormat, RenderOptions, Renderer};
//! use metric_charts_values::Values;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let values = Values::from_path(std::path::Path::new("scraper-values.yaml"))?;
//! let renderer = Renderer::new(RenderOptions::default());
//! let manifest = renderer.render(ChartKind::Scraper, &values)?;
//! println!("{}", manifest.to_text(ManifestFormat::Yaml)?);
//! # Ok(())
//! # }
//! ```

pub mod chart;
pub mod deployment;
pub mod manifest;
pub mod pusher;
pub mod renderer;
pub mod scraper;
pub mod yaml;

pub use chart::{Chart, ChartKind};
pub use manifest::{render_documents, verify_manifest, Manifest, ManifestFormat};
pub use pusher::{MetricPusher, PUSHER_PORT};
pub use renderer::Renderer;
pub use scraper::MetricScraper;

use metric_charts_values::ValuesError;
use thiserror::Error;

/// Errors raised while rendering a chart
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Values(#[from] ValuesError),

    #[error("failed to serialize {chart} manifest: {reason}")]
    Serialize { chart: String, reason: String },

    #[error("invalid {chart} manifest: {reason}")]
    InvalidManifest { chart: String, reason: String },
}

impl RenderError {
    /// True when a required value was absent from the values object
    pub fn is_missing_value(&self) -> bool {
        matches!(self, Self::Values(ValuesError::MissingValue { .. }))
    }

    pub(crate) fn invalid_value(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Values(ValuesError::InvalidValue {
            path: path.into(),
            reason: reason.into(),
        })
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Render-time settings that are not part of the chart values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    /// Namespace written into `metadata.namespace`; omitted when `None`
    pub namespace: Option<String>,
    /// Release name for the `app.kubernetes.io/instance` label; defaults to the chart name
    pub release: Option<String>,
}

impl RenderOptions {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Namespace and release must be DNS-1123 labels
    pub fn validate(&self) -> Result<()> {
        if let Some(ref namespace) = self.namespace {
            validate_dns_label("namespace", namespace)?;
        }
        if let Some(ref release) = self.release {
            validate_dns_label("release", release)?;
        }
        Ok(())
    }

    pub(crate) fn instance_for(&self, kind: ChartKind) -> String {
        self.release
            .clone()
            .unwrap_or_else(|| kind.name().to_string())
    }
}

/// Maximum length of a DNS-1123 label and of a label value
pub const MAX_LABEL_LENGTH: usize = 63;

fn validate_dns_label(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(RenderError::invalid_value(field, "cannot be empty"));
    }

    if value.len() > MAX_LABEL_LENGTH {
        return Err(RenderError::invalid_value(
            field,
            format!("exceeds maximum length of {}", MAX_LABEL_LENGTH),
        ));
    }

    let valid_chars = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
    if !value.chars().all(valid_chars) {
        return Err(RenderError::invalid_value(
            field,
            "must contain only lowercase alphanumeric characters and dashes",
        ));
    }

    if value.starts_with('-') || value.ends_with('-') {
        return Err(RenderError::invalid_value(
            field,
            "must start and end with an alphanumeric character",
        ));
    }

    Ok(())
}
