//! Study schema validation
//!
//! The schema is an ordinary JSON Schema document handed to
//! [`SchemaValidator::new`]. The built-in study schema ships in
//! `schemas/study.schema.json` and is embedded at compile time.

use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{ImportError, Result};

/// Built-in study record schema
pub const STUDY_SCHEMA: &str = include_str!("../schemas/study.schema.json");

/// The first structural violation found in a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// Human readable description
    pub message: String,
    /// JSON pointer to the offending value ("" for the document root)
    pub instance_path: String,
}

pub type ValidationResult = std::result::Result<(), SchemaViolation>;

/// Compiled schema validator
pub struct SchemaValidator {
    compiled: JSONSchema,
}

impl SchemaValidator {
    /// Compile an arbitrary schema document
    pub fn new(schema: &Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|e| ImportError::SchemaCompile(e.to_string()))?;
        Ok(Self { compiled })
    }

    /// Validator for the built-in study schema
    pub fn study() -> Result<Self> {
        let schema: Value = serde_json::from_str(STUDY_SCHEMA)?;
        Self::new(&schema)
    }

    /// Load a schema override from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let schema: Value = serde_json::from_str(&content)?;
        Self::new(&schema)
    }

    /// Validate a decoded record, stopping at the first violation.
    pub fn validate(&self, record: &Value) -> ValidationResult {
        match self.compiled.validate(record) {
            Ok(()) => Ok(()),
            Err(mut errors) => match errors.next() {
                Some(error) => Err(SchemaViolation {
                    message: error.to_string(),
                    instance_path: error.instance_path.to_string(),
                }),
                None => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_study() -> Value {
        json!({
            "study_id": "S-001",
            "title": "Voice biomarkers for Parkinson's disease",
            "authors": [
                {"name": "A. Author", "affiliations": [{"institution": "Uni", "country": "NL"}]}
            ],
            "publication_type": "journal",
            "journal": "Speech Journal",
            "year": 2021,
            "doi": "10.1000/voice.1",
            "source_dataset": [{"name": "PC-GITA", "size": 100, "pd_patients": 50, "controls": 50}],
            "ml_approaches": [
                {
                    "algorithm": "SVM",
                    "feature_selection": {"methods": ["mRMR"], "combination": "union"},
                    "scaling": ["z-score"],
                    "results": {"accuracy": 0.91, "note": "10-fold", "auc": null}
                }
            ]
        })
    }

    #[test]
    fn test_valid_record_passes() {
        let validator = SchemaValidator::study().unwrap();
        assert_eq!(validator.validate(&valid_study()), Ok(()));
    }

    #[test]
    fn test_year_as_string_passes() {
        let validator = SchemaValidator::study().unwrap();
        let mut study = valid_study();
        study["year"] = json!("2021");
        assert!(validator.validate(&study).is_ok());
    }

    #[test]
    fn test_extra_top_level_fields_allowed() {
        let validator = SchemaValidator::study().unwrap();
        let mut study = valid_study();
        study["reviewer_notes"] = json!({"anything": [1, 2, 3]});
        assert!(validator.validate(&study).is_ok());
    }

    #[test]
    fn test_each_missing_required_field_is_named() {
        let validator = SchemaValidator::study().unwrap();
        for field in [
            "study_id", "title", "authors", "publication_type",
            "journal", "year", "doi", "ml_approaches",
        ] {
            let mut study = valid_study();
            study.as_object_mut().unwrap().remove(field);
            let violation = validator.validate(&study).unwrap_err();
            assert!(
                violation.message.contains(field),
                "expected '{}' in '{}'", field, violation.message
            );
        }
    }

    #[test]
    fn test_composite_result_values_rejected() {
        let validator = SchemaValidator::study().unwrap();
        for bad in [json!({"fold": 1}), json!([0.9, 0.8])] {
            let mut study = valid_study();
            study["ml_approaches"][0]["results"]["accuracy"] = bad;
            let violation = validator.validate(&study).unwrap_err();
            assert_eq!(violation.instance_path, "/ml_approaches/0/results/accuracy");
        }
    }

    #[test]
    fn test_approach_requires_algorithm_and_results() {
        let validator = SchemaValidator::study().unwrap();
        let mut study = valid_study();
        study["ml_approaches"][0].as_object_mut().unwrap().remove("results");
        assert!(validator.validate(&study).is_err());

        let mut study = valid_study();
        study["ml_approaches"][0].as_object_mut().unwrap().remove("algorithm");
        assert!(validator.validate(&study).is_err());
    }

    #[test]
    fn test_empty_ml_approaches_rejected() {
        let validator = SchemaValidator::study().unwrap();
        let mut study = valid_study();
        study["ml_approaches"] = json!([]);
        assert!(validator.validate(&study).is_err());
    }

    #[test]
    fn test_feature_selection_null_or_methods_object() {
        let validator = SchemaValidator::study().unwrap();
        let mut study = valid_study();
        study["ml_approaches"][0]["feature_selection"] = Value::Null;
        assert!(validator.validate(&study).is_ok());

        study["ml_approaches"][0]["feature_selection"] = json!({"combination": "union"});
        assert!(validator.validate(&study).is_err());
    }

    #[test]
    fn test_alternate_schema_substitution() {
        let schema = json!({"type": "object", "required": ["doi"]});
        let validator = SchemaValidator::new(&schema).unwrap();
        assert!(validator.validate(&json!({"doi": "x"})).is_ok());
        assert!(validator.validate(&json!({"title": "x"})).is_err());
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let schema = json!({"type": "not-a-type"});
        assert!(matches!(
            SchemaValidator::new(&schema),
            Err(ImportError::SchemaCompile(_))
        ));
    }
}
