//! # Value Overrides
//!
//! `--set path=value` expressions layered on top of values files.
//!
//! Several assignments can share one expression when separated by commas
//! (`image.tag=v2,replicaCount=3`). A backslash escapes `.`, `,` and `=`.

use crate::tree::{Values, ValuesPath};
use crate::{Result, ValuesError};
use serde_yaml::Value;

/// How the right-hand side of an override is typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKind {
    /// `--set`: integers, booleans and `null` are typed, everything else is a string
    Typed,
    /// `--set-string`: always a string
    String,
}

/// A single `path=value` assignment
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub path: ValuesPath,
    pub value: Value,
}

impl Override {
    pub fn apply(&self, values: &mut Values) -> Result<()> {
        values.set(&self.path, self.value.clone())
    }
}

/// Parse an override expression into its assignments
pub fn parse_override(expr: &str, kind: OverrideKind) -> Result<Vec<Override>> {
    split_unescaped(expr, ',')
        .into_iter()
        .map(|assignment| parse_assignment(&assignment, kind, expr))
        .collect()
}

fn parse_assignment(assignment: &str, kind: OverrideKind, expr: &str) -> Result<Override> {
    let Some(eq) = find_unescaped(assignment, '=') else {
        return Err(ValuesError::InvalidOverride(format!(
            "'{}' is not of the form path=value",
            expr
        )));
    };

    let path = ValuesPath::parse(&assignment[..eq]);
    if !path.is_valid() {
        return Err(ValuesError::InvalidOverride(format!(
            "'{}' has an empty key",
            expr
        )));
    }

    let raw = unescape(&assignment[eq + 1..]);
    let value = match kind {
        OverrideKind::String => Value::String(raw),
        OverrideKind::Typed => typed_scalar(raw),
    };

    Ok(Override { path, value })
}

fn typed_scalar(raw: String) -> Value {
    match raw.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => match raw.parse::<i64>() {
            // keep leading zeros and explicit signs as written
            Ok(n) if n.to_string() == raw => Value::from(n),
            _ => Value::String(raw),
        },
    }
}

/// Split on `sep` unless preceded by a backslash, keeping escapes intact
fn split_unescaped(input: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Byte offset of the first unescaped `needle`
fn find_unescaped(input: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == needle {
            return Some(i);
        }
    }
    None
}

fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
