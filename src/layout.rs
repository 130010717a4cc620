//! Layout documents and default merging.
//!
//! Layouts and states are plain JSON-shaped values. Every component merges
//! the caller's layout over its own defaults with [`merge_layouts`] before
//! reading it.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// Merge `custom` over `default`, returning a new value.
///
/// Keys present in `custom` win outright, whatever their type, except that
/// two objects under the same key are merged recursively. Keys missing from
/// `custom` (or set to `null`) take a deep copy of the default. Neither
/// input is modified.
///
/// # Errors
///
/// Returns [`Error::InvalidConfiguration`] if either argument is not an
/// object.
pub fn merge_layouts(custom: &Value, default: &Value) -> Result<Value> {
    match (custom, default) {
        (Value::Object(custom), Value::Object(default)) => Ok(Value::Object(merge_maps(custom, default))),
        _ => Err(Error::InvalidConfiguration(
            "layout merge requires two objects".to_string(),
        )),
    }
}

fn merge_maps(custom: &Map<String, Value>, default: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = custom.clone();
    for (key, default_value) in default {
        let slot = merged.entry(key.clone()).or_insert(Value::Null);
        if slot.is_null() {
            *slot = default_value.clone();
        } else if let (Value::Object(custom_inner), Value::Object(default_inner)) = (slot, default_value) {
            *custom_inner = merge_maps(custom_inner, default_inner);
        }
    }
    merged
}

/// Parse a layout document from YAML (JSON is valid YAML).
///
/// # Errors
///
/// Returns an error if the text is not valid YAML.
pub fn from_yaml(text: &str) -> Result<Value> {
    Ok(serde_yaml_ng::from_str(text)?)
}

/// Load a layout document from a YAML or JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(path: impl AsRef<Path>) -> Result<Value> {
    let text = std::fs::read_to_string(path)?;
    from_yaml(&text)
}
