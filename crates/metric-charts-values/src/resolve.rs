//! # Values Resolution
//!
//! Reads typed chart values out of an untyped [`Values`] tree. Every failure
//! names the dotted path that caused it.

use crate::model::{EnvMap, ImageValues, PullPolicy, PusherValues, ScraperEnv, ScraperValues};
use crate::tree::{kind_of, Values, ValuesPath};
use crate::{Result, ValuesError};
use serde_yaml::Value;
use std::str::FromStr;
use tracing::debug;

/// Path-addressed accessors over a values tree
pub struct ValuesReader<'a> {
    values: &'a Values,
}

impl<'a> ValuesReader<'a> {
    pub fn new(values: &'a Values) -> Self {
        Self { values }
    }

    /// Value at `path`; `null` counts as absent
    pub fn get(&self, path: &str) -> Option<&'a Value> {
        match self.values.lookup(&ValuesPath::parse(path)) {
            Some(Value::Null) | None => None,
            Some(value) => Some(value),
        }
    }

    /// Non-empty scalar rendered as text
    pub fn required_string(&self, path: &str) -> Result<String> {
        let value = self.get(path).ok_or_else(|| ValuesError::missing(path))?;
        let text = scalar_to_string(path, value)?;
        if text.is_empty() {
            return Err(ValuesError::missing(path));
        }
        Ok(text)
    }

    /// Integer in `1..=i32::MAX`
    pub fn positive_int(&self, path: &str) -> Result<u32> {
        let value = self.get(path).ok_or_else(|| ValuesError::missing(path))?;
        let n = match value {
            Value::Number(n) => n.as_u64().ok_or_else(|| {
                ValuesError::invalid(path, format!("expected a positive integer, found {}", n))
            })?,
            other => {
                return Err(ValuesError::invalid(
                    path,
                    format!("expected a positive integer, found {}", kind_of(other)),
                ))
            }
        };

        if n == 0 || n > i32::MAX as u64 {
            return Err(ValuesError::invalid(
                path,
                format!("expected a positive integer, found {}", n),
            ));
        }
        Ok(n as u32)
    }

    /// Optional string parsed with `FromStr`
    pub fn optional_parse<T>(&self, path: &str) -> Result<Option<T>>
    where
        T: FromStr<Err = String>,
    {
        match self.get(path) {
            None => Ok(None),
            Some(Value::String(s)) => s.parse().map(Some).map_err(|e| ValuesError::invalid(path, e)),
            Some(other) => Err(ValuesError::invalid(
                path,
                format!("expected a string, found {}", kind_of(other)),
            )),
        }
    }

    /// Optional mapping, returned as a YAML value
    pub fn optional_mapping(&self, path: &str) -> Result<Option<Value>> {
        match self.get(path) {
            None => Ok(None),
            Some(value @ Value::Mapping(_)) => Ok(Some(value.clone())),
            Some(other) => Err(ValuesError::invalid(
                path,
                format!("expected a mapping, found {}", kind_of(other)),
            )),
        }
    }

    /// Optional string-to-scalar mapping, in document order
    pub fn string_map(&self, path: &str) -> Result<EnvMap> {
        let mapping = match self.get(path) {
            None => return Ok(EnvMap::new()),
            Some(Value::Mapping(mapping)) => mapping,
            Some(other) => {
                return Err(ValuesError::invalid(
                    path,
                    format!("expected a mapping, found {}", kind_of(other)),
                ))
            }
        };

        let mut map = EnvMap::new();
        for (key, value) in mapping {
            let Value::String(name) = key else {
                return Err(ValuesError::invalid(
                    path,
                    format!("keys must be strings, found {}", kind_of(key)),
                ));
            };
            if name.is_empty() {
                return Err(ValuesError::invalid(path, "variable names must not be empty"));
            }
            let entry_path = ValuesPath::parse(path).child(name.as_str()).to_string();
            if value.is_null() {
                return Err(ValuesError::missing(entry_path));
            }
            let text = scalar_to_string(&entry_path, value)?;
            map.insert(name.as_str(), text);
        }
        Ok(map)
    }

    fn image(&self) -> Result<ImageValues> {
        Ok(ImageValues {
            repository: self.required_string("image.repository")?,
            tag: self.required_string("image.tag")?,
            pull_policy: self
                .optional_parse::<PullPolicy>("image.pullPolicy")?
                .unwrap_or_default(),
        })
    }
}

/// Text of a string, integer or boolean
///
/// Floats are refused: by the time YAML has parsed `1.10` the trailing zero
/// is gone, so only a quoted value keeps the text as written.
pub(crate) fn scalar_to_string(path: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Value::Number(n) => Err(ValuesError::invalid(
            path,
            format!("non-integer number {}, quote it to keep the text as written", n),
        )),
        other => Err(ValuesError::invalid(
            path,
            format!("expected a scalar, found {}", kind_of(other)),
        )),
    }
}

impl ScraperValues {
    /// Resolve scraper values; every env variable is required
    pub fn from_values(values: &Values) -> Result<Self> {
        let reader = ValuesReader::new(values);

        let resolved = Self {
            replica_count: reader.positive_int("replicaCount")?,
            image: reader.image()?,
            env: ScraperEnv {
                scraper_user: reader.required_string("env.SCRAPER_USER")?,
                scraper_pass: reader.required_string("env.SCRAPER_PASS")?,
                auth_url: reader.required_string("env.AUTH_URL")?,
                ingest_url: reader.required_string("env.INGEST_URL")?,
            },
            resources: reader.optional_mapping("resources")?,
        };

        debug!(
            "Resolved scraper values: replicas={} image={}",
            resolved.replica_count,
            resolved.image.reference()
        );
        Ok(resolved)
    }
}

impl PusherValues {
    /// Resolve pusher values; `env` is optional and keeps document order
    pub fn from_values(values: &Values) -> Result<Self> {
        let reader = ValuesReader::new(values);

        let resolved = Self {
            replica_count: reader.positive_int("replicaCount")?,
            image: reader.image()?,
            env: reader.string_map("env")?,
            resources: reader.optional_mapping("resources")?,
        };

        debug!(
            "Resolved pusher values: replicas={} image={} env_vars={}",
            resolved.replica_count,
            resolved.image.reference(),
            resolved.env.len()
        );
        Ok(resolved)
    }
}
