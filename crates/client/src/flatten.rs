//! Conversion between nested setting forms and flat dot-keyed entries.

use std::collections::BTreeMap;

use domain::models::SettingEntry;
use serde_json::{Map, Value};

/// Flattens one section of a nested form into `prefix.field` entries.
///
/// Each direct field becomes one entry: strings are kept as-is, other scalars
/// are rendered as text, arrays and objects are stored as JSON text, and
/// `null` clears the setting. With an empty `prefix` the top-level fields are
/// treated as sections and flattened in turn.
pub fn flatten_settings(prefix: &str, value: &Value) -> Vec<SettingEntry> {
    let Some(fields) = value.as_object() else {
        return Vec::new();
    };

    if prefix.is_empty() {
        return fields
            .iter()
            .flat_map(|(section, section_value)| flatten_settings(section, section_value))
            .collect();
    }

    fields
        .iter()
        .map(|(field, field_value)| {
            SettingEntry::new(format!("{}.{}", prefix, field), to_raw(field_value))
        })
        .collect()
}

/// Rebuilds the nested form of `settings` under `prefix`.
///
/// Keys outside `prefix.` are ignored; an empty `prefix` takes every key.
/// Remaining dots nest further. Values that look like JSON arrays or objects
/// are parsed back.
pub fn unflatten_settings(settings: &BTreeMap<String, String>, prefix: &str) -> Value {
    let mut root = Map::new();

    for (key, raw) in settings {
        let path = if prefix.is_empty() {
            Some(key.as_str())
        } else {
            key.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('.'))
        };
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            continue;
        };

        insert_path(&mut root, path, from_raw(raw));
    }

    Value::Object(root)
}

fn to_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn from_raw(raw: &str) -> Value {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str(raw) {
            return value;
        }
    }
    Value::String(raw.to_string())
}

/// A leaf already present where a nested object is needed is replaced.
fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}
