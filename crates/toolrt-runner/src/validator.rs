//! Pluggable input/output schema validation.

use serde_json::Value;

/// Validates a JSON value against a JSON Schema document.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, schema: &Value, value: &Value) -> Result<(), String>;
}

/// Default validator backed by the `jsonschema` crate.
#[derive(Debug, Default)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema: &Value, value: &Value) -> Result<(), String> {
        let compiled = jsonschema::JSONSchema::compile(schema)
            .map_err(|e| format!("invalid schema: {e}"))?;

        if let Err(errors) = compiled.validate(value) {
            let message = errors
                .map(|error| error.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_matching_value() {
        let schema = json!({"type": "object", "required": ["x"], "properties": {"x": {"type": "number"}}});
        let validator = JsonSchemaValidator;
        assert!(validator.validate(&schema, &json!({"x": 1})).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let schema = json!({"type": "object", "required": ["x"]});
        let validator = JsonSchemaValidator;
        assert!(validator.validate(&schema, &json!({})).is_err());
    }
}
