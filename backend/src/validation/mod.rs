//! JSON Schema validation for incoming data sets and report configs.
//!
//! Schemas (Draft 7) are embedded at compile time from `schemas/`:
//! - `dataset.json` - array of flat records
//! - `report-config.json` - saved pivot parameters
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use pivotdesk::validation::validate_dataset;
//!
//! assert!(validate_dataset(&json!([{ "region": "N", "sales": 100 }])).is_ok());
//! assert!(validate_dataset(&json!({ "region": "N" })).is_err());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static DATASET_SCHEMA: Lazy<Result<Value, String>> =
    Lazy::new(|| parse_schema(include_str!("../../schemas/dataset.json")));

static REPORT_CONFIG_SCHEMA: Lazy<Result<Value, String>> =
    Lazy::new(|| parse_schema(include_str!("../../schemas/report-config.json")));

fn parse_schema(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid embedded schema: {}", e))
}

/// Validate `data` against `schema`, collecting every error message.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

fn validate_embedded(schema: &Result<Value, String>, data: &Value) -> Result<(), Vec<String>> {
    match schema {
        Ok(schema) => validate(schema, data),
        Err(e) => Err(vec![e.clone()]),
    }
}

/// Validate a JSON data set (array of flat objects).
pub fn validate_dataset(data: &Value) -> Result<(), Vec<String>> {
    validate_embedded(&DATASET_SCHEMA, data)
}

/// Validate a saved or submitted report config.
pub fn validate_report_config(data: &Value) -> Result<(), Vec<String>> {
    validate_embedded(&REPORT_CONFIG_SCHEMA, data)
}
