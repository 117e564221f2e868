//! # metric-pusher chart
//!
//! Serves on container port 8082; env is whatever the caller supplies,
//! in the caller's order.

use crate::chart::{Chart, ChartKind};
use crate::deployment::{build_deployment, env_var, ContainerSpec};
use crate::{RenderOptions, Result};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ContainerPort;
use metric_charts_values::{PusherValues, Values, ValuesError};

/// Port the pusher's HTTP API listens on
pub const PUSHER_PORT: i32 = 8082;

pub struct MetricPusher;

impl Chart for MetricPusher {
    const KIND: ChartKind = ChartKind::Pusher;
    const NAME: &'static str = "metric-pusher";

    type Values = PusherValues;

    fn resolve(values: &Values) -> std::result::Result<PusherValues, ValuesError> {
        PusherValues::from_values(values)
    }

    fn build(values: &PusherValues, options: &RenderOptions) -> Result<Deployment> {
        let env = values
            .env
            .iter()
            .map(|(name, value)| env_var(name, value))
            .collect();

        let port = ContainerPort {
            name: Some("http".to_string()),
            container_port: PUSHER_PORT,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        };

        build_deployment(
            ContainerSpec {
                kind: Self::KIND,
                replicas: values.replica_count,
                image: &values.image,
                env,
                ports: vec![port],
                resources: values.resources.as_ref(),
            },
            options,
        )
    }

    fn default_values() -> PusherValues {
        PusherValues::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metric_charts_values::EnvMap;

    #[test]
    fn test_pusher_port() {
        let deployment =
            MetricPusher::build(&PusherValues::defaults(), &RenderOptions::default()).unwrap();

        let pod_spec = deployment.spec.unwrap().template.spec.unwrap();
        let ports = pod_spec.containers[0].ports.as_ref().unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].container_port, 8082);
        assert_eq!(ports[0].name.as_deref(), Some("http"));
    }

    #[test]
    fn test_pusher_empty_env_renders_no_env() {
        let mut values = PusherValues::defaults();
        values.env = EnvMap::new();

        let deployment = MetricPusher::build(&values, &RenderOptions::default()).unwrap();
        let pod_spec = deployment.spec.unwrap().template.spec.unwrap();
        assert!(pod_spec.containers[0].env.is_none());
    }
}
