//! Pivot core: aggregation, unit conversion, matrix building and sorting.
//!
//! Everything here is pure and total. Given the same rows and parameters,
//! [`build_matrix`] returns the same matrix.

pub mod aggregate;
pub mod conversion;
pub mod engine;
pub mod measure;
pub mod sort;

pub use aggregate::{aggregate, Accumulator, AggregationFunction};
pub use conversion::{
    convert_value, detect_field_type, field_total_with_unit, format_value_with_unit, ConversionRule,
    ConversionSet, Dimension, TargetUnit,
};
pub use engine::{
    build_matrix, join_key, ColumnHeader, GroupKey, PivotMatrix, PivotRow, SumOfCellAggregates,
    KEY_SEPARATOR, TOTAL_COLUMN,
};
pub use measure::{dedupe_measures, measure_key, ValueField};
pub use sort::{sort_rows, SortDirection, SortKey, SortState};
