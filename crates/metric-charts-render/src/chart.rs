//! # Charts
//!
//! The two charts this crate knows how to render

use crate::{MetricPusher, MetricScraper, RenderOptions, Result};
use k8s_openapi::api::apps::v1::Deployment;
use metric_charts_values::{values_schema, Values, ValuesError};
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Chart identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartKind {
    Scraper,
    Pusher,
}

impl ChartKind {
    /// Every chart, in render order
    pub const fn all() -> [ChartKind; 2] {
        [ChartKind::Scraper, ChartKind::Pusher]
    }

    /// Deployment and container name
    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Scraper => MetricScraper::NAME,
            ChartKind::Pusher => MetricPusher::NAME,
        }
    }

    /// Starter values for this chart
    pub fn default_values(&self) -> std::result::Result<Values, ValuesError> {
        match self {
            ChartKind::Scraper => Values::from_serializable(&MetricScraper::default_values()),
            ChartKind::Pusher => Values::from_serializable(&MetricPusher::default_values()),
        }
    }

    /// JSON Schema of this chart's values
    pub fn values_schema(&self) -> RootSchema {
        match self {
            ChartKind::Scraper => MetricScraper::schema(),
            ChartKind::Pusher => MetricPusher::schema(),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scraper" | "metric-scraper" => Ok(ChartKind::Scraper),
            "pusher" | "metric-pusher" => Ok(ChartKind::Pusher),
            other => Err(format!("unknown chart '{}'", other)),
        }
    }
}

/// A chart: typed values in, one Deployment out
pub trait Chart {
    const KIND: ChartKind;
    const NAME: &'static str;

    type Values: Serialize + JsonSchema;

    /// Resolve typed values from a values tree
    fn resolve(values: &Values) -> std::result::Result<Self::Values, ValuesError>;

    /// Build the Deployment
    fn build(values: &Self::Values, options: &RenderOptions) -> Result<Deployment>;

    fn default_values() -> Self::Values;

    /// JSON Schema of [`Chart::Values`]
    fn schema() -> RootSchema {
        values_schema::<Self::Values>()
    }
}
