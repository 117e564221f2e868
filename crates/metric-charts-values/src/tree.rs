//! # Values Tree
//!
//! Untyped values object with Helm layering semantics

use crate::{Result, ValuesError};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Dotted path into a values tree, e.g. `image.tag`
///
/// A backslash escapes the next character, so `podLabels.app\.io/tier`
/// addresses the key `app.io/tier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValuesPath(Vec<String>);

impl ValuesPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse a dotted path
    pub fn parse(dotted: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = dotted.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => current.push('\\'),
                },
                '.' => segments.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        segments.push(current);

        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Path extended by one key
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// True when the path has at least one segment and none are empty
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|s| !s.is_empty())
    }
}

impl fmt::Display for ValuesPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.replace('.', "\\."))?;
        }
        Ok(())
    }
}

impl From<&str> for ValuesPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

/// Values object: a YAML mapping at the root
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    root: Mapping,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(root: Mapping) -> Self {
        Self { root }
    }

    /// Parse values from YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse_document(text, "<inline>")
    }

    /// Load values from a YAML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ValuesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded values file {}", path.display());
        Self::parse_document(&text, &path.display().to_string())
    }

    /// Build a values tree from any serializable value
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        let value = serde_yaml::to_value(value).map_err(|source| ValuesError::Parse {
            origin: std::any::type_name::<T>().to_string(),
            source,
        })?;
        Self::from_root_value(value)
    }

    fn parse_document(text: &str, origin: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|source| ValuesError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        Self::from_root_value(value)
    }

    fn from_root_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Mapping(root) => Ok(Self { root }),
            other => Err(ValuesError::invalid(
                "<root>",
                format!("values must be a mapping, found {}", kind_of(&other)),
            )),
        }
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn into_mapping(self) -> Mapping {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Layer `other` on top of these values
    ///
    /// Mappings merge recursively, any other value replaces the existing
    /// one, and an explicit `null` deletes the key.
    pub fn merge(&mut self, other: Values) {
        merge_mappings(&mut self.root, other.root);
    }

    /// Value at `path`, if present
    pub fn lookup(&self, path: &ValuesPath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.get(first.as_str())?;
        for segment in rest {
            current = current.as_mapping()?.get(segment.as_str())?;
        }
        Some(current)
    }

    /// Set the value at `path`, creating intermediate mappings
    ///
    /// Setting `null` removes the key and never creates parents.
    pub fn set(&mut self, path: &ValuesPath, value: Value) -> Result<()> {
        if !path.is_valid() {
            return Err(ValuesError::InvalidOverride(format!(
                "invalid path '{}'",
                path
            )));
        }

        let (last, parents) = path
            .segments()
            .split_last()
            .ok_or_else(|| ValuesError::InvalidOverride("empty path".to_string()))?;

        let mut current = &mut self.root;
        if value.is_null() {
            for segment in parents {
                match current.get_mut(segment.as_str()) {
                    Some(Value::Mapping(next)) => current = next,
                    _ => return Ok(()),
                }
            }
            current.shift_remove(last.as_str());
            return Ok(());
        }

        for segment in parents {
            let slot = current
                .entry(Value::String(segment.clone()))
                .or_insert(Value::Null);
            if !slot.is_mapping() {
                *slot = Value::Mapping(Mapping::new());
            }
            let Value::Mapping(next) = slot else {
                return Err(ValuesError::invalid(path.to_string(), "expected a mapping"));
            };
            current = next;
        }

        current.insert(Value::String(last.clone()), value);
        Ok(())
    }

    /// Mapping stored under a top-level key, used for umbrella values
    pub fn section(&self, key: &str) -> Result<Values> {
        match self.root.get(key) {
            None | Some(Value::Null) => Err(ValuesError::missing(key)),
            Some(Value::Mapping(section)) => Ok(Values::from_mapping(section.clone())),
            Some(other) => Err(ValuesError::invalid(
                key,
                format!("expected a mapping, found {}", kind_of(other)),
            )),
        }
    }

    pub fn to_yaml_string(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.root)
    }
}

fn merge_mappings(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match value {
            Value::Null => {
                base.shift_remove(&key);
            }
            Value::Mapping(incoming) => match base.get_mut(&key) {
                Some(Value::Mapping(existing)) => merge_mappings(existing, incoming),
                _ => {
                    let mut fresh = Mapping::new();
                    merge_mappings(&mut fresh, incoming);
                    base.insert(key, Value::Mapping(fresh));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

/// Human-readable name of a YAML node type
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
