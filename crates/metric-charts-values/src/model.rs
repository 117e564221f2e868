//! # Chart Values Model
//!
//! Typed values for the `metric-scraper` and `metric-pusher` charts.

use schemars::JsonSchema;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::str::FromStr;

/// Pull policy for container images
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema, Default)]
pub enum PullPolicy {
    #[serde(rename = "Always")]
    Always,

    #[default]
    #[serde(rename = "IfNotPresent")]
    IfNotPresent,

    #[serde(rename = "Never")]
    Never,
}

impl PullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "Always",
            PullPolicy::IfNotPresent => "IfNotPresent",
            PullPolicy::Never => "Never",
        }
    }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Always" => Ok(PullPolicy::Always),
            "IfNotPresent" => Ok(PullPolicy::IfNotPresent),
            "Never" => Ok(PullPolicy::Never),
            other => Err(format!(
                "'{}' is not one of Always, IfNotPresent, Never",
                other
            )),
        }
    }
}

/// Image specification
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageValues {
    /// Repository name, including any registry prefix
    pub repository: String,

    /// Image tag
    pub tag: String,

    /// Image pull policy
    #[serde(default)]
    pub pull_policy: PullPolicy,
}

impl ImageValues {
    /// `repository:tag` as written into the container spec
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

/// Environment of the scraper: four fixed, required scalars
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ScraperEnv {
    /// Username presented to the auth endpoint
    #[serde(rename = "SCRAPER_USER")]
    pub scraper_user: String,

    /// Password presented to the auth endpoint
    #[serde(rename = "SCRAPER_PASS")]
    pub scraper_pass: String,

    /// Token endpoint of the pusher
    #[serde(rename = "AUTH_URL")]
    pub auth_url: String,

    /// Ingest endpoint of the pusher
    #[serde(rename = "INGEST_URL")]
    pub ingest_url: String,
}

impl ScraperEnv {
    /// Variable names, in render order
    pub const KEYS: [&'static str; 4] = ["SCRAPER_USER", "SCRAPER_PASS", "AUTH_URL", "INGEST_URL"];

    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            (Self::KEYS[0], self.scraper_user.as_str()),
            (Self::KEYS[1], self.scraper_pass.as_str()),
            (Self::KEYS[2], self.auth_url.as_str()),
            (Self::KEYS[3], self.ingest_url.as_str()),
        ]
    }
}

/// String map that remembers insertion order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvMap(Vec<(String, String)>);

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable; a replaced variable keeps its position
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = EnvMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for EnvMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EnvMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EnvMapVisitor;

        impl<'de> Visitor<'de> for EnvMapVisitor {
            type Value = EnvMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of environment variable names to strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<EnvMap, A::Error> {
                let mut map = EnvMap::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    map.insert(k, v);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(EnvMapVisitor)
    }
}

/// Values of the `metric-scraper` chart
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScraperValues {
    /// Number of replicas
    #[schemars(range(min = 1))]
    pub replica_count: u32,

    /// Image configuration
    pub image: ImageValues,

    /// Scraper credentials and pusher endpoints
    pub env: ScraperEnv,

    /// Resource requests and limits, passed through to the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Map<String, serde_json::Value>>")]
    pub resources: Option<Value>,
}

impl ScraperValues {
    /// Starter values; env mirrors the scraper binary's own fallbacks
    pub fn defaults() -> Self {
        Self {
            replica_count: 1,
            image: ImageValues {
                repository: "metric-scraper".to_string(),
                tag: "latest".to_string(),
                pull_policy: PullPolicy::IfNotPresent,
            },
            env: ScraperEnv {
                scraper_user: "user".to_string(),
                scraper_pass: "pass".to_string(),
                auth_url: "http://localhost:8082/auth".to_string(),
                ingest_url: "http://localhost:8082/ingest".to_string(),
            },
            resources: Some(Value::Mapping(Mapping::new())),
        }
    }
}

/// Values of the `metric-pusher` chart
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PusherValues {
    /// Number of replicas
    #[schemars(range(min = 1))]
    pub replica_count: u32,

    /// Image configuration
    pub image: ImageValues,

    /// Environment variables, rendered in the order given
    #[serde(default)]
    #[schemars(with = "std::collections::BTreeMap<String, String>")]
    pub env: EnvMap,

    /// Resource requests and limits, passed through to the container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<serde_json::Map<String, serde_json::Value>>")]
    pub resources: Option<Value>,
}

impl PusherValues {
    /// Starter values listing every variable the pusher reads
    pub fn defaults() -> Self {
        let env = [
            ("AUTH_SHARED_SECRET", "my-secret-key"),
            ("AUTH_STATIC_TOKEN", "optional-static-token"),
            ("CLICKHOUSE_HOST", "127.0.0.1"),
            ("CLICKHOUSE_DB", "metrics"),
            ("CLICKHOUSE_USER", "default"),
            ("CLICKHOUSE_PASSWORD", ""),
            ("SCRAPER_USER", "user"),
            ("SCRAPER_PASS", "pass"),
        ]
        .into_iter()
        .collect();

        Self {
            replica_count: 1,
            image: ImageValues {
                repository: "metric-pusher".to_string(),
                tag: "latest".to_string(),
                pull_policy: PullPolicy::IfNotPresent,
            },
            env,
            resources: Some(Value::Mapping(Mapping::new())),
        }
    }
}
