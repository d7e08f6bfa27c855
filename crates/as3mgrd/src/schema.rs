//! Schema validation gate.
//!
//! Declarations that do not match the AS3 schema are dropped before they
//! reach the control plane. Structural validation itself is delegated to
//! the `jsonschema` crate.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::error;

use as3_common::{As3Error, As3Result};

/// Compiled AS3 reference schema.
pub struct SchemaValidator {
    validator: jsonschema::Validator,
    reference: String,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Compiles a schema document.
    ///
    /// `reference` names the schema in log output (usually its path).
    ///
    /// # Errors
    ///
    /// Returns [`As3Error::Schema`] if the schema is not valid JSON Schema.
    pub fn new(schema: &Value, reference: impl Into<String>) -> As3Result<Self> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| As3Error::schema(format!("invalid JSON schema: {}", e)))?;

        Ok(Self {
            validator,
            reference: reference.into(),
        })
    }

    /// Loads and compiles a schema from a local file.
    pub fn from_file(path: impl AsRef<Path>) -> As3Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let schema: Value = serde_json::from_str(&contents).map_err(|e| {
            As3Error::schema(format!("failed to parse {}: {}", path.display(), e))
        })?;

        Self::new(&schema, path.display().to_string())
    }

    /// Returns the schema reference this validator was built from.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Returns true if `document` is well-formed JSON that satisfies the schema.
    ///
    /// Every violation is logged.
    pub fn validate(&self, document: &str) -> bool {
        let instance: Value = match serde_json::from_str(document) {
            Ok(value) => value,
            Err(e) => {
                error!(schema = %self.reference, error = %e, "Declaration is not valid JSON");
                return false;
            }
        };

        let mut valid = true;
        for violation in self.validator.iter_errors(&instance) {
            if valid {
                error!(schema = %self.reference, "Declaration is not valid, see errors");
                valid = false;
            }
            error!("- {}", violation);
        }

        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn as3_schema() -> Value {
        json!({
            "type": "object",
            "required": ["class", "declaration"],
            "properties": {
                "class": { "const": "AS3" },
                "declaration": {
                    "type": "object",
                    "required": ["class", "schemaVersion"],
                    "properties": {
                        "class": { "const": "ADC" },
                        "schemaVersion": { "type": "string" }
                    }
                }
            }
        })
    }

    #[test]
    fn test_valid_declaration() {
        let validator = SchemaValidator::new(&as3_schema(), "inline").unwrap();
        let doc = r#"{"class":"AS3","declaration":{"class":"ADC","schemaVersion":"3.20.0"}}"#;

        assert!(validator.validate(doc));
        assert_eq!(validator.reference(), "inline");
    }

    #[test]
    fn test_structural_mismatch() {
        let validator = SchemaValidator::new(&as3_schema(), "inline").unwrap();

        assert!(!validator.validate(r#"{"class":"AS3"}"#));
        assert!(!validator.validate(r#"{"class":"ADC","declaration":{}}"#));
    }

    #[test]
    fn test_malformed_document() {
        let validator = SchemaValidator::new(&as3_schema(), "inline").unwrap();
        assert!(!validator.validate("{\"class\": "));
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let result = SchemaValidator::new(&json!({"type": 12}), "broken");
        assert!(matches!(result, Err(As3Error::Schema { .. })));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", as3_schema()).unwrap();

        let validator = SchemaValidator::from_file(file.path()).unwrap();
        assert!(validator.reference().ends_with(
            file.path()
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
        ));
    }

    #[test]
    fn test_from_file_not_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not a schema").unwrap();

        assert!(matches!(
            SchemaValidator::from_file(file.path()),
            Err(As3Error::Schema { .. })
        ));
    }
}
