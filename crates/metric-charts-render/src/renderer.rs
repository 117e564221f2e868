//! # Renderer
//!
//! Resolves values for a chart and builds its manifest

use crate::chart::{Chart, ChartKind};
use crate::manifest::{render_documents, Manifest, ManifestFormat};
use crate::{MetricPusher, MetricScraper, RenderOptions, Result};
use metric_charts_values::Values;
use tracing::debug;

/// Chart renderer
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render one chart from its own values
    pub fn render(&self, kind: ChartKind, values: &Values) -> Result<Manifest> {
        self.options.validate()?;

        match kind {
            ChartKind::Scraper => self.render_chart::<MetricScraper>(values),
            ChartKind::Pusher => self.render_chart::<MetricPusher>(values),
        }
    }

    /// Render every chart from umbrella values keyed by chart name
    pub fn render_umbrella(&self, values: &Values) -> Result<Vec<Manifest>> {
        ChartKind::all()
            .into_iter()
            .map(|kind| {
                let section = values.section(kind.name())?;
                self.render(kind, &section)
            })
            .collect()
    }

    /// Render, self-verify and serialize one chart
    pub fn render_text(&self, kind: ChartKind, values: &Values, format: ManifestFormat) -> Result<String> {
        let manifest = self.render(kind, values)?;
        manifest.verify()?;
        render_documents(std::slice::from_ref(&manifest), format)
    }

    fn render_chart<C: Chart>(&self, values: &Values) -> Result<Manifest> {
        let resolved = C::resolve(values)?;
        let deployment = C::build(&resolved, &self.options)?;

        debug!(
            "Rendered {} (namespace: {})",
            C::NAME,
            self.options.namespace.as_deref().unwrap_or("<unset>")
        );

        Ok(Manifest::new(C::KIND, deployment))
    }
}
