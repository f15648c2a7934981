//! # Pivotdesk - pivot tables over flat record sets
//!
//! Pivotdesk reshapes a flat table of records into a cross-tabulated
//! summary (row groups × column groups × aggregated measures), with date
//! and field filters, unit conversion, CSV/chart export and saved reports.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / JSON  │────▶│   Filters   │────▶│ Pivot engine│────▶│ CSV / chart │
//! │  (records)  │     │ (date+field)│     │ (+ convert) │     │  / reports  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pivotdesk::{load_dataset, PivotSession, matrix_to_csv};
//!
//! let mut session = PivotSession::new(load_dataset("sales.csv")?);
//! session.set_row_fields(vec!["region".into()]);
//! session.add_measure("sales");
//! if let Some(matrix) = session.matrix() {
//!     println!("{}", matrix_to_csv(&matrix));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Field values, records, data sets
//! - [`parser`] - CSV parsing with auto-detection
//! - [`filter`] - Date and field filters
//! - [`pivot`] - Aggregation, conversion, matrix building, sorting
//! - [`export`] - CSV and chart series
//! - [`report`] - Saved report configs and stores
//! - [`session`] - Live pivot parameters over one data set
//! - [`validation`] - JSON Schema validation
//! - [`config`] - Environment settings
//! - [`cli`] - Command-line argument parsers
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Ingestion
pub mod parser;
pub mod validation;

// Pivot core
pub mod filter;
pub mod pivot;

// Outputs
pub mod export;
pub mod report;

// Orchestration
pub mod cli;
pub mod config;
pub mod session;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, CsvError, DatasetError, ExportError, ReportError, ServerError, SessionError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Dataset, FieldValue, Record, DATE_FIELD};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv_file_auto,
    ParseResult,
};

// =============================================================================
// Re-exports - Filters
// =============================================================================

pub use filter::{
    apply_filters, filter_by_date, filter_by_date_at, filter_by_fields, filtered_count,
    DateFilterConfig, DateFilterKind, FieldFilterConfig, RelativeRange,
};

// =============================================================================
// Re-exports - Pivot
// =============================================================================

pub use pivot::{
    aggregate, build_matrix, convert_value, detect_field_type, field_total_with_unit,
    format_value_with_unit, AggregationFunction, ConversionRule, Dimension, PivotMatrix, PivotRow, SortKey, SortState,
    SumOfCellAggregates, TargetUnit, ValueField,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{bar_series, matrix_to_csv, pie_series, write_csv_file, ChartKind};

// =============================================================================
// Re-exports - Reports
// =============================================================================

pub use report::{JsonFileStore, MemoryStore, PivotReport, ReportConfig, ReportPatch, ReportStore};

// =============================================================================
// Re-exports - Session
// =============================================================================

pub use config::Settings;
pub use session::{dataset_from_json, load_dataset, PivotSession};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, PivotRequest, PivotResponse, UploadResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
