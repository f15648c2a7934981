//! Export artifacts built from a matrix.
//!
//! - [`csv`] - CSV file export
//! - [`chart`] - Bar and pie chart series

pub mod chart;
pub mod csv;

pub use self::chart::{bar_series, chart_series, pie_series, ChartKind, PieSlice};
pub use self::csv::{matrix_to_csv, write_csv_file, GRAND_TOTAL_LABEL};
