//! Tests for the metric-charts-render crate

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use metric_charts_render::*;
use metric_charts_values::{Values, ValuesPath};
use proptest::prelude::*;
use serde_yaml::Value;

const SCRAPER_VALUES: &str = r#"
replicaCount: 2
image:
  repository: "reg/scraper"
  tag: "v1"
  pullPolicy: "IfNotPresent"
env:
  SCRAPER_USER: "u"
  SCRAPER_PASS: "p"
  AUTH_URL: "http://a"
  INGEST_URL: "http://b"
resources:
  requests:
    cpu: "100m"
"#;

const PUSHER_VALUES: &str = r#"
replicaCount: 1
image:
  repository: reg/pusher
  tag: "1.4"
env:
  CLICKHOUSE_HOST: clickhouse.metrics.svc
  CLICKHOUSE_DB: metrics
  AUTH_STATIC_TOKEN: "12345"
  DEBUG: true
resources:
  limits:
    cpu: 2
    memory: 512Mi
"#;

fn values(text: &str) -> Values {
    Values::from_yaml_str(text).unwrap()
}

fn container(deployment: &Deployment) -> &k8s_openapi::api::core::v1::Container {
    &deployment
        .spec
        .as_ref()
        .unwrap()
        .template
        .spec
        .as_ref()
        .unwrap()
        .containers[0]
}

#[test]
fn test_scraper_example_renders() {
    let text = Renderer::default()
        .render_text(ChartKind::Scraper, &values(SCRAPER_VALUES), ManifestFormat::Yaml)
        .unwrap();

    let deployments = verify_manifest(&text).unwrap();
    assert_eq!(deployments.len(), 1);
    let deployment = &deployments[0];

    assert_eq!(deployment.metadata.name.as_deref(), Some("metric-scraper"));
    assert_eq!(deployment.spec.as_ref().unwrap().replicas, Some(2));

    let container = container(deployment);
    assert_eq!(container.image.as_deref(), Some("reg/scraper:v1"));
    assert_eq!(container.image_pull_policy.as_deref(), Some("IfNotPresent"));
    assert!(container.ports.is_none());

    let env: Vec<(&str, &str)> = container
        .env
        .as_ref()
        .unwrap()
        .iter()
        .map(|e| (e.name.as_str(), e.value.as_deref().unwrap()))
        .collect();
    assert_eq!(
        env,
        vec![
            ("SCRAPER_USER", "u"),
            ("SCRAPER_PASS", "p"),
            ("AUTH_URL", "http://a"),
            ("INGEST_URL", "http://b"),
        ]
    );

    let requests = container.resources.as_ref().unwrap().requests.as_ref().unwrap();
    assert_eq!(requests.get("cpu"), Some(&Quantity("100m".to_string())));
}

#[test]
fn test_scraper_yaml_text() {
    let text = Renderer::default()
        .render_text(ChartKind::Scraper, &values(SCRAPER_VALUES), ManifestFormat::Yaml)
        .unwrap();

    assert!(text.starts_with("---\n# Source: metric-scraper/templates/deployment.yaml\n"));
    assert!(text.contains("kind: Deployment"));
    assert!(text.contains("replicas: 2"));

    let parsed: Value = serde_yaml::from_str(&text).unwrap();
    assert_eq!(parsed["apiVersion"], Value::from("apps/v1"));
}

#[test]
fn test_missing_auth_url_fails() {
    let mut v = values(SCRAPER_VALUES);
    v.set(&"env.AUTH_URL".into(), Value::Null).unwrap();

    let err = Renderer::default().render(ChartKind::Scraper, &v).unwrap_err();
    assert!(err.is_missing_value());
    assert_eq!(err.to_string(), "missing required value: env.AUTH_URL");
}

#[test]
fn test_each_scraper_env_is_required() {
    for key in ["SCRAPER_USER", "SCRAPER_PASS", "AUTH_URL", "INGEST_URL"] {
        let mut v = values(SCRAPER_VALUES);
        v.set(&ValuesPath::new(["env", key]), Value::Null).unwrap();
        let err = Renderer::default().render(ChartKind::Scraper, &v).unwrap_err();
        assert!(err.is_missing_value(), "{} should be required", key);
    }
}

#[test]
fn test_pusher_renders_port_and_ordered_env() {
    let manifest = Renderer::default()
        .render(ChartKind::Pusher, &values(PUSHER_VALUES))
        .unwrap();
    manifest.verify().unwrap();

    let container = container(&manifest.deployment);
    let ports = container.ports.as_ref().unwrap();
    assert_eq!(ports[0].container_port, PUSHER_PORT);

    let env: Vec<(&str, &str)> = container
        .env
        .as_ref()
        .unwrap()
        .iter()
        .map(|e| (e.name.as_str(), e.value.as_deref().unwrap()))
        .collect();
    assert_eq!(
        env,
        vec![
            ("CLICKHOUSE_HOST", "clickhouse.metrics.svc"),
            ("CLICKHOUSE_DB", "metrics"),
            ("AUTH_STATIC_TOKEN", "12345"),
            ("DEBUG", "true"),
        ]
    );

    let limits = container.resources.as_ref().unwrap().limits.as_ref().unwrap();
    assert_eq!(limits.get("cpu"), Some(&Quantity("2".to_string())));
    assert_eq!(container.image.as_deref(), Some("reg/pusher:1.4"));
}

#[test]
fn test_string_like_env_values_stay_strings_in_yaml() {
    let text = Renderer::default()
        .render_text(ChartKind::Pusher, &values(PUSHER_VALUES), ManifestFormat::Yaml)
        .unwrap();

    let parsed: Value = serde_yaml::from_str(&text).unwrap();
    let env = &parsed["spec"]["template"]["spec"]["containers"][0]["env"];
    assert_eq!(env[2]["value"], Value::from("12345"));
    assert_eq!(env[3]["value"], Value::from("true"));
}

#[test]
fn test_json_output() {
    let text = Renderer::default()
        .render_text(ChartKind::Pusher, &values(PUSHER_VALUES), ManifestFormat::Json)
        .unwrap();

    let deployment: Deployment = serde_json::from_str(&text).unwrap();
    assert_eq!(deployment.metadata.name.as_deref(), Some("metric-pusher"));
}

#[test]
fn test_render_documents_stream() {
    let renderer = Renderer::new(RenderOptions::default().with_namespace("metrics"));
    let manifests = vec![
        renderer.render(ChartKind::Scraper, &values(SCRAPER_VALUES)).unwrap(),
        renderer.render(ChartKind::Pusher, &values(PUSHER_VALUES)).unwrap(),
    ];

    let yaml = render_documents(&manifests, ManifestFormat::Yaml).unwrap();
    let deployments = verify_manifest(&yaml).unwrap();
    assert_eq!(deployments.len(), 2);
    assert!(deployments
        .iter()
        .all(|d| d.metadata.namespace.as_deref() == Some("metrics")));

    let json = render_documents(&manifests, ManifestFormat::Json).unwrap();
    let list: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(list["kind"], "List");
    assert_eq!(list["items"].as_array().unwrap().len(), 2);
}

#[test]
fn test_unknown_resources_key_is_render_error() {
    let mut v = values(PUSHER_VALUES);
    v.set(&"resources.limit.cpu".into(), Value::from("1")).unwrap();

    let err = Renderer::default().render(ChartKind::Pusher, &v).unwrap_err();
    assert!(!err.is_missing_value());
    assert!(err.to_string().contains("resources.limit"));
}

#[test]
fn test_yaml11_ambiguous_strings_are_quoted() {
    let mut v = values("replicaCount: 1\nimage:\n  repository: reg/pusher\n  tag: \"on\"\n");
    let entries = [("A", "on"), ("B", "yes"), ("C", "off"), ("D", "y"), ("E", "1_000")];
    for (key, value) in entries {
        v.set(&ValuesPath::new(["env", key]), Value::from(value)).unwrap();
    }

    let text = Renderer::default()
        .render_text(ChartKind::Pusher, &v, ManifestFormat::Yaml)
        .unwrap();
    for (_, value) in entries {
        assert!(text.contains(&format!("value: '{}'\n", value)), "{} not quoted:\n{}", value, text);
    }
    assert!(text.contains("image: reg/pusher:on\n"));
    assert!(text.contains("app.kubernetes.io/version: 'on'\n"));

    let deployments = verify_manifest(&text).unwrap();
    let rendered: Vec<(String, String)> = container(&deployments[0])
        .env
        .clone()
        .unwrap()
        .into_iter()
        .map(|e| (e.name, e.value.unwrap()))
        .collect();
    let expected: Vec<(String, String)> = entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert_eq!(rendered, expected);
}

fn yaml11_non_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "(y|Y|yes|Yes|YES|n|N|no|No|NO|on|On|ON|off|Off|OFF|true|False|null|~)",
        "[-+]?[1-9][0-9_]{0,6}",
        "0[0-7]{1,4}",
        "0x[0-9a-f]{1,4}",
        "[1-9][0-9]{0,2}:[0-5][0-9]",
        "[0-9]{1,3}\\.[0-9]{0,3}",
    ]
}

proptest! {
    #[test]
    fn prop_yaml11_non_strings_render_quoted(word in yaml11_non_string()) {
        let mut v = values("replicaCount: 1\nimage:\n  repository: reg/pusher\n  tag: v1\n");
        v.set(&"env.VALUE".into(), Value::from(word.as_str())).unwrap();

        let text = Renderer::default()
            .render_text(ChartKind::Pusher, &v, ManifestFormat::Yaml)
            .unwrap();
        let expected_line = format!("value: '{}'\n", word);
        prop_assert!(text.contains(&expected_line));

        let deployments = verify_manifest(&text).unwrap();
        let env = container(&deployments[0]).env.clone().unwrap();
        prop_assert_eq!(env[0].value.as_deref(), Some(word.as_str()));
    }

    #[test]
    fn prop_rendering_is_deterministic(
        replicas in 1u32..500,
        tag in "[a-z0-9][a-z0-9.-]{0,20}",
        user in "[ -~]{1,30}",
        url in "https?://[a-z]{1,10}(:[0-9]{2,5})?/[a-z]{0,10}",
    ) {
        let mut v = values(SCRAPER_VALUES);
        v.set(&"replicaCount".into(), Value::from(replicas)).unwrap();
        v.set(&"image.tag".into(), Value::from(tag.as_str())).unwrap();
        v.set(&"env.SCRAPER_USER".into(), Value::from(user.as_str())).unwrap();
        v.set(&"env.INGEST_URL".into(), Value::from(url.as_str())).unwrap();

        let renderer = Renderer::default();
        let first = renderer.render_text(ChartKind::Scraper, &v, ManifestFormat::Yaml).unwrap();
        let second = renderer.render_text(ChartKind::Scraper, &v.clone(), ManifestFormat::Yaml).unwrap();
        prop_assert_eq!(&first, &second);

        let deployments = verify_manifest(&first).unwrap();
        let env = container(&deployments[0]).env.clone().unwrap();
        prop_assert_eq!(env[0].value.as_deref(), Some(user.as_str()));
        prop_assert_eq!(env[3].value.as_deref(), Some(url.as_str()));
    }

    #[test]
    fn prop_pusher_env_one_pair_per_key_in_order(
        entries in proptest::collection::vec(("[A-Z][A-Z0-9_]{0,12}", "[ -~]{0,20}"), 0..16)
    ) {
        let mut v = values("replicaCount: 1\nimage:\n  repository: reg/pusher\n  tag: v1\n");
        let mut expected: Vec<(String, String)> = Vec::new();
        for (k, val) in entries {
            if expected.iter().any(|(existing, _)| *existing == k) {
                continue;
            }
            v.set(&ValuesPath::new(["env", k.as_str()]), Value::from(val.as_str())).unwrap();
            expected.push((k, val));
        }

        let text = Renderer::default()
            .render_text(ChartKind::Pusher, &v, ManifestFormat::Yaml)
            .unwrap();
        let deployments = verify_manifest(&text).unwrap();
        let rendered: Vec<(String, String)> = container(&deployments[0])
            .env
            .clone()
            .unwrap_or_default()
            .into_iter()
            .map(|e| (e.name, e.value.unwrap_or_default()))
            .collect();
        prop_assert_eq!(rendered, expected);
    }
}
