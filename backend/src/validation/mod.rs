//! JSON Schema validation for rule configuration files.
//!
//! The schema is embedded at compile time from `schemas/rules-config.json`
//! and checked before a configuration is turned into a registry.

use once_cell::sync::Lazy;
use serde_json::Value;

static RULES_CONFIG_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/rules-config.json"))
        .expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` when valid
/// * `Err(Vec<String>)` with one message per violation
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use timesdash::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": {
///         "name": { "type": "string" }
///     }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a rules configuration document.
pub fn validate_rules_config(data: &Value) -> Result<(), Vec<String>> {
    validate(&RULES_CONFIG_SCHEMA, data)
}

/// Quick check against the rules configuration schema.
pub fn is_valid_rules_config(data: &Value) -> bool {
    is_valid(&RULES_CONFIG_SCHEMA, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_default_is_valid() {
        let config: Value =
            serde_json::from_str(crate::rules::default_rules_json()).unwrap();
        assert!(validate_rules_config(&config).is_ok());
    }

    #[test]
    fn test_minimal_config() {
        let config = json!({
            "rules": [
                {
                    "category": "emission",
                    "key": { "type": "first_n", "n": 3 },
                    "chart": { "shape": "line", "title": "Emissions" }
                }
            ]
        });
        assert!(is_valid_rules_config(&config));
    }

    #[test]
    fn test_unknown_shape_rejected() {
        let config = json!({
            "rules": [
                {
                    "category": "emission",
                    "key": { "type": "first_n", "n": 3 },
                    "chart": { "shape": "donut", "title": "Emissions" }
                }
            ]
        });
        assert!(!is_valid_rules_config(&config));
    }

    #[test]
    fn test_key_variant_fields_checked() {
        let config = json!({
            "rules": [
                {
                    "category": "resmix",
                    "key": { "type": "first_n", "strip_suffixes": ["HOUSE"] },
                    "chart": { "shape": "stacked_bar", "title": "Residential" }
                }
            ]
        });
        let errors = validate_rules_config(&config).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_label_values_must_be_text() {
        let config = json!({ "rules": [], "labels": { "ELC": 3 } });
        assert!(!is_valid_rules_config(&config));
    }
}
