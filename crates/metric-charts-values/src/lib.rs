//! # Chart Values
//!
//! Values objects for the `metric-scraper` and `metric-pusher` charts.
//!
//! A values object is an untyped YAML tree, layered the way Helm layers
//! `-f` files and `--set` flags, and then resolved into the typed values
//! each chart consumes:
//!
//! - [`Values`]: the raw tree (load, merge, lookup, set)
//! - [`parse_override`]: `--set path=value` parsing
//! - [`ScraperValues`] / [`PusherValues`]: typed chart inputs
//! - [`values_schema`]: JSON Schema for a chart's values

pub mod model;
pub mod overrides;
pub mod resolve;
pub mod schema;
pub mod tree;

pub use model::{EnvMap, ImageValues, PullPolicy, PusherValues, ScraperEnv, ScraperValues};
pub use overrides::{parse_override, Override, OverrideKind};
pub use resolve::ValuesReader;
pub use schema::{values_schema, values_schema_json};
pub use tree::{Values, ValuesPath};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or resolving values
#[derive(Error, Debug)]
pub enum ValuesError {
    #[error("missing required value: {path}")]
    MissingValue { path: String },

    #[error("invalid value at {path}: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("failed to parse values from {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read values file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid override: {0}")]
    InvalidOverride(String),
}

impl ValuesError {
    pub(crate) fn missing(path: impl Into<String>) -> Self {
        Self::MissingValue { path: path.into() }
    }

    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Path of the offending value, if the error refers to one
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::MissingValue { path } | Self::InvalidValue { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ValuesError>;
