//! # Kubernetes YAML
//!
//! `serde_yaml` quotes strings by YAML 1.2 rules. The API server and
//! kubectl resolve plain scalars by YAML 1.1 rules, where `on`, `yes` and
//! `1_000` are not strings, so any string either reader would resolve to
//! another type is emitted single-quoted.

use lazy_static::lazy_static;
use regex::RegexSet;
use serde::Serialize;
use serde_yaml::Value;

lazy_static! {
    /// Plain scalars that resolve to bool, null, int or float under YAML 1.1 or 1.2
    static ref NON_STRING_SCALARS: RegexSet = RegexSet::new([
        // bool (1.1 and 1.2)
        r"^(y|Y|yes|Yes|YES|n|N|no|No|NO|true|True|TRUE|false|False|FALSE|on|On|ON|off|Off|OFF)$",
        // null
        r"^(~|null|Null|NULL|)$",
        // int, including 1.1 binary, octal, underscores and base 60
        r"^[-+]?(0b[0-1_]+|0o?[0-7_]+|0|[1-9][0-9_]*|0x[0-9a-fA-F_]+|[1-9][0-9_]*(:[0-5]?[0-9])+)$",
        // float, with or without a fraction
        r"^[-+]?([0-9][0-9_]*)?\.[0-9_.]*([eE][-+]?[0-9]+)?$",
        r"^[-+]?[0-9][0-9_]*([eE][-+]?[0-9]+)$",
        r"^[-+]?[0-9][0-9_]*(:[0-5]?[0-9])+\.[0-9_]*$",
        r"^[-+]?\.(inf|Inf|INF)$",
        r"^\.(nan|NaN|NAN)$",
        // merge key and value key
        r"^(<<|=)$",
    ])
    .unwrap();
}

/// True when this text, written as a plain scalar, would not read back as a string
pub fn needs_quoting(text: &str) -> bool {
    NON_STRING_SCALARS.is_match(text)
}

const PLACEHOLDER_PREFIX: &str = "metric-charts-quoted-";

/// Serialize as YAML that every Kubernetes reader parses back to the same strings
pub fn to_string<T: Serialize>(value: &T) -> Result<String, serde_yaml::Error> {
    let mut tree = serde_yaml::to_value(value)?;
    let plain = serde_yaml::to_string(&tree)?;

    let mut prefix = PLACEHOLDER_PREFIX.to_string();
    while plain.contains(&prefix) {
        prefix.push('x');
    }

    let mut quoted = Vec::new();
    substitute_placeholders(&mut tree, &prefix, &mut quoted);
    if quoted.is_empty() {
        return Ok(plain);
    }

    let mut text = serde_yaml::to_string(&tree)?;
    for (index, original) in quoted.iter().enumerate() {
        text = text.replace(&placeholder(&prefix, index), &single_quoted(original));
    }
    Ok(text)
}

fn placeholder(prefix: &str, index: usize) -> String {
    format!("{}{}-end", prefix, index)
}

fn single_quoted(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn substitute_placeholders(value: &mut Value, prefix: &str, quoted: &mut Vec<String>) {
    match value {
        Value::String(text) if needs_quoting(text) => {
            let original = std::mem::replace(text, placeholder(prefix, quoted.len()));
            quoted.push(original);
        }
        Value::Sequence(items) => {
            for item in items {
                substitute_placeholders(item, prefix, quoted);
            }
        }
        Value::Mapping(mapping) => {
            for (mut key, mut item) in std::mem::take(mapping) {
                substitute_placeholders(&mut key, prefix, quoted);
                substitute_placeholders(&mut item, prefix, quoted);
                mapping.insert(key, item);
            }
        }
        Value::Tagged(tagged) => substitute_placeholders(&mut tagged.value, prefix, quoted),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_yaml11_scalars_need_quoting() {
        for text in [
            "on", "Off", "yes", "NO", "y", "n", "true", "~", "null", "", "1_000", "0755", "0o17",
            "0x1F", "0b101", "1e3", "1.5", ".5", "-.inf", ".NaN", "12:30", "+7", "<<", "=",
        ] {
            assert!(needs_quoting(text), "{:?} should be quoted", text);
        }
    }

    #[test]
    fn test_ordinary_strings_stay_plain() {
        for text in [
            "reg/pusher:1.4", "100m", "512Mi", "v1", "http://a", "online", "yesterday", "IfNotPresent",
            "metric-pusher", "1.2.3-rc",
        ] {
            assert!(!needs_quoting(text), "{:?} should stay plain", text);
        }
    }

    #[test]
    fn test_to_string_quotes_ambiguous_values_and_keys() {
        let doc = BTreeMap::from([
            ("flag", "on"),
            ("count", "1_000"),
            ("name", "web"),
            ("yes", "key"),
            ("quote", "n"),
        ]);
        let text = to_string(&doc).unwrap();

        assert!(text.contains("flag: 'on'\n"));
        assert!(text.contains("count: '1_000'\n"));
        assert!(text.contains("name: web\n"));
        assert!(text.contains("'yes': key\n"));
        assert!(text.contains("quote: 'n'\n"));

        let parsed: BTreeMap<String, String> = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed.get("flag").map(String::as_str), Some("on"));
        assert_eq!(parsed.get("yes").map(String::as_str), Some("key"));
    }

    #[test]
    fn test_to_string_survives_placeholder_lookalikes() {
        let doc = vec!["metric-charts-quoted-0-end".to_string(), "off".to_string()];
        let text = to_string(&doc).unwrap();

        let parsed: Vec<String> = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed, doc);
        assert!(text.contains("- 'off'\n"));
    }
}
