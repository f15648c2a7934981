//! Data set loading for the CLI and the server.
//!
//! `.json` files hold an array of flat objects and are schema-checked;
//! anything else is read as CSV with encoding and delimiter detection.

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::api::logs::{log_info, log_success};
use crate::error::{DatasetError, DatasetResult};
use crate::models::Dataset;
use crate::parser::{parse_bytes_auto, parse_csv_file_auto};
use crate::validation::validate_dataset;

/// Validate a JSON value against the data set schema and decode it.
pub fn dataset_from_json(value: &Value) -> DatasetResult<Dataset> {
    validate_dataset(value).map_err(|errors| DatasetError::Invalid { errors })?;
    Dataset::from_json(value)
}

/// Load a data set from a `.json` or CSV file.
pub fn load_dataset<P: AsRef<Path>>(path: P) -> DatasetResult<Dataset> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let dataset = if is_json {
        log_info(format!("Reading JSON data set {}", path.display()));
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        dataset_from_json(&value)?
    } else {
        log_info(format!("Reading CSV data set {}", path.display()));
        let parsed = parse_csv_file_auto(path)?;
        log_info(format!(
            "Encoding {}, delimiter '{}', {} columns",
            parsed.encoding,
            format_delimiter(parsed.delimiter),
            parsed.headers.len()
        ));
        parsed.dataset
    };

    log_success(format!("Loaded {} records", dataset.len()));
    Ok(dataset)
}

/// Load a CSV upload held in memory.
pub fn load_csv_bytes(bytes: &[u8]) -> DatasetResult<Dataset> {
    let parsed = parse_bytes_auto(bytes)?;
    log_success(format!(
        "Parsed upload: {} records, {} columns",
        parsed.dataset.len(),
        parsed.headers.len()
    ));
    Ok(parsed.dataset)
}

pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
