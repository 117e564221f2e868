//! # metric-scraper chart
//!
//! No container port; env carries the four scraper settings in a fixed order.

use crate::chart::{Chart, ChartKind};
use crate::deployment::{build_deployment, env_var, ContainerSpec};
use crate::{RenderOptions, Result};
use k8s_openapi::api::apps::v1::Deployment;
use metric_charts_values::{ScraperValues, Values, ValuesError};

pub struct MetricScraper;

impl Chart for MetricScraper {
    const KIND: ChartKind = ChartKind::Scraper;
    const NAME: &'static str = "metric-scraper";

    type Values = ScraperValues;

    fn resolve(values: &Values) -> std::result::Result<ScraperValues, ValuesError> {
        ScraperValues::from_values(values)
    }

    fn build(values: &ScraperValues, options: &RenderOptions) -> Result<Deployment> {
        let env = values
            .env
            .entries()
            .iter()
            .map(|(name, value)| env_var(name, value))
            .collect();

        build_deployment(
            ContainerSpec {
                kind: Self::KIND,
                replicas: values.replica_count,
                image: &values.image,
                env,
                ports: Vec::new(),
                resources: values.resources.as_ref(),
            },
            options,
        )
    }

    fn default_values() -> ScraperValues {
        ScraperValues::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scraper_env_order_and_no_ports() {
        let deployment =
            MetricScraper::build(&ScraperValues::defaults(), &RenderOptions::default()).unwrap();

        let pod_spec = deployment.spec.unwrap().template.spec.unwrap();
        let container = &pod_spec.containers[0];
        assert!(container.ports.is_none());

        let env = container.env.as_ref().unwrap();
        let names: Vec<&str> = env.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["SCRAPER_USER", "SCRAPER_PASS", "AUTH_URL", "INGEST_URL"]);
        assert_eq!(env[2].value.as_deref(), Some("http://localhost:8082/auth"));
    }
}
