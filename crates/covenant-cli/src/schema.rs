//! JSON Schema validation for manifests.
//!
//! Manifests are checked against schema/manifest.schema.json before they
//! are deserialized, so structural mistakes are reported with their path.

use std::sync::OnceLock;

use thiserror::Error;

/// Embedded manifest schema (loaded at compile time).
const MANIFEST_SCHEMA_JSON: &str = include_str!("../schema/manifest.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(MANIFEST_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;
        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a manifest against the schema, collecting every violation.
pub fn validate_manifest_schema(manifest: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(manifest)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_manifest_passes() {
        let value = serde_json::json!({
            "module": {"name": "m", "file": "m.rs"}
        });
        assert!(validate_manifest_schema(&value).is_ok());
    }

    #[test]
    fn test_full_manifest_passes() {
        let value = serde_json::json!({
            "module": {
                "name": "calc",
                "file": "src/calc.rs",
                "globals": {
                    "number": {"type": "float"},
                    "MyNum": {"class": "MyNum"},
                    "limit": {"value": 3}
                }
            },
            "functions": [{
                "name": "add",
                "params": ["a1", "a2"],
                "kind": "method",
                "nesting": ["Calc"],
                "doc": "@type a1: int",
                "calls": [
                    {"args": [1, 2], "returns": 3},
                    {"kwargs": {"a1": "x"}, "expect": "argument_type"},
                    {"args": [1], "raises": "boom", "caller": {"number": {"type": "int"}}}
                ]
            }]
        });
        assert!(validate_manifest_schema(&value).is_ok());
    }

    #[test]
    fn test_unknown_fields_fail() {
        let value = serde_json::json!({
            "module": {"name": "m", "file": "m.rs"},
            "extra": true
        });
        assert!(validate_manifest_schema(&value).is_err());
    }

    #[test]
    fn test_global_needs_exactly_one_form() {
        let value = serde_json::json!({
            "module": {
                "name": "m",
                "file": "m.rs",
                "globals": {"x": {"type": "int", "class": "X"}}
            }
        });
        assert!(validate_manifest_schema(&value).is_err());
    }

    #[test]
    fn test_call_cannot_both_return_and_raise() {
        let value = serde_json::json!({
            "module": {"name": "m", "file": "m.rs"},
            "functions": [{"name": "f", "calls": [{"returns": 1, "raises": "boom"}]}]
        });
        let errors = validate_manifest_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_invalid_kind_fails() {
        let value = serde_json::json!({
            "module": {"name": "m", "file": "m.rs"},
            "functions": [{"name": "f", "kind": "lambda"}]
        });
        assert!(validate_manifest_schema(&value).is_err());
    }
}
