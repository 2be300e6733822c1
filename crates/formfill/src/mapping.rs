//! Field mapping ingestion
//!
//! The mapping arrives as a JSON object produced by an external
//! collaborator. Unknown fields are encoded as `""` by that collaborator;
//! this module only converts the object into a [`Mapping`].

use crate::{FillError, Mapping, Result};
use std::path::Path;

/// Parse a mapping from a JSON string
pub fn parse_mapping(json: &str) -> Result<Mapping> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    mapping_from_value(&value)
}

/// Read and parse a mapping file
pub fn load_mapping<P: AsRef<Path>>(path: P) -> Result<Mapping> {
    let json = std::fs::read_to_string(path)?;
    parse_mapping(&json)
}

/// Convert a JSON object into a mapping
///
/// Scalar values are stringified; `null` becomes the empty string.
pub fn mapping_from_value(value: &serde_json::Value) -> Result<Mapping> {
    let object = value.as_object().ok_or_else(|| {
        FillError::InvalidMapping(format!("expected a JSON object, got {}", kind_of(value)))
    })?;

    Ok(object
        .iter()
        .map(|(name, value)| (name.clone(), value_to_string(value)))
        .collect())
}

/// Convert a JSON value to the string written into a field
pub fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => value.to_string(),
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_mapping() {
        let mapping = parse_mapping(r#"{ "First": "Jane", "Last": "Doe" }"#).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["First"], "Jane");
        assert_eq!(mapping["Last"], "Doe");
    }

    #[test]
    fn test_scalar_values_are_stringified() {
        let mapping = mapping_from_value(&json!({
            "Age": 42,
            "Member": true,
            "Missing": null,
            "Tags": ["a", "b"],
        }))
        .unwrap();

        assert_eq!(mapping["Age"], "42");
        assert_eq!(mapping["Member"], "true");
        assert_eq!(mapping["Missing"], "");
        assert_eq!(mapping["Tags"], r#"["a","b"]"#);
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("Hänsel")), "Hänsel");
        assert_eq!(value_to_string(&json!(1.5)), "1.5");
        assert_eq!(value_to_string(&json!(null)), "");
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = parse_mapping("[1, 2]").unwrap_err();
        assert!(matches!(err, FillError::InvalidMapping(_)));
        assert_eq!(err.to_string(), "Invalid mapping: expected a JSON object, got an array");
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_mapping("{ not json").unwrap_err();
        assert_eq!(err.kind(), "invalid_mapping");
    }
}
