//! Error types for the pivot backend.
//!
//! The pivot core itself (filters, aggregation, conversion, matrix
//! building) is total and never fails. Errors only arise at the edges:
//!
//! - [`CsvError`] - CSV ingestion errors
//! - [`DatasetError`] - JSON data set ingestion errors
//! - [`ReportError`] - Report store I/O and serialization errors
//! - [`ExportError`] - Export writing errors
//! - [`ConfigError`] - Settings errors
//! - [`SessionError`] - Top-level errors for CLI and server flows
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Ingestion Errors
// =============================================================================

/// Errors while reading a CSV data set.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV content.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Empty input.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Header line missing or blank.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::Parse {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Dataset Errors
// =============================================================================

/// Errors while reading a JSON data set.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Top-level value is not an array.
    #[error("Data set must be a JSON array of objects")]
    NotAnArray,

    /// An element of the array is not an object.
    #[error("Record {0} is not a JSON object")]
    NotAnObject(usize),

    /// Schema validation failed.
    #[error("Data set failed validation: {errors:?}")]
    Invalid { errors: Vec<String> },

    /// JSON syntax error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV ingestion error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// IO error.
    #[error("Failed to read data set: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Report Store Errors
// =============================================================================

/// Errors from a report store.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Report name empty after trimming.
    #[error("Report name must not be empty")]
    EmptyName,

    /// Report config failed schema validation.
    #[error("Invalid report config: {errors:?}")]
    InvalidConfig { errors: Vec<String> },

    /// IO error.
    #[error("Report store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Report store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing an export artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Failed to serialize export: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable present but unparsable.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Session Errors (top-level)
// =============================================================================

/// Top-level errors for CLI and server flows.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Data set ingestion error.
    #[error("Data set error: {0}")]
    Dataset(#[from] DatasetError),

    /// Report store error.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Settings error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Report id unknown to the store.
    #[error("Report not found: {0}")]
    ReportNotFound(String),

    /// Malformed command-line or request argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<CsvError> for SessionError {
    fn from(err: CsvError) -> Self {
        SessionError::Dataset(DatasetError::Csv(err))
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for data set operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Result type for report store operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
