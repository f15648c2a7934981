//! CSV serialization of a pivot matrix.
//!
//! Layout: row-field names, then `{column}_{measure}` for every column and
//! measure, then `Total_{measure}`. One line per matrix row, then a
//! `Grand Total` line. Text is quoted, raw numbers are not, lines are
//! joined with `\n` without a trailing newline.

use std::fs;
use std::path::Path;

use crate::error::ExportResult;
use crate::models::format_number;
use crate::pivot::PivotMatrix;

/// Label of the trailing totals line.
pub const GRAND_TOTAL_LABEL: &str = "Grand Total";

/// Serialize `matrix`. A matrix with no rows serializes to `""`.
pub fn matrix_to_csv(matrix: &PivotMatrix) -> String {
    if matrix.rows.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(matrix.rows.len() + 2);
    lines.push(header_line(matrix));

    for row in &matrix.rows {
        let mut cells: Vec<String> = row.group_key.iter().map(|v| quote(&v.as_key_string())).collect();
        for c in 0..matrix.column_headers.len() {
            for m in 0..matrix.measure_keys.len() {
                cells.push(format_number(row.cell(c, m)));
            }
        }
        for m in 0..matrix.measure_keys.len() {
            cells.push(format_number(row.total(m)));
        }
        lines.push(cells.join(","));
    }

    lines.push(grand_total_line(matrix));
    lines.join("\n")
}

fn header_line(matrix: &PivotMatrix) -> String {
    let mut cells: Vec<String> = matrix.row_fields.iter().map(|f| quote(f)).collect();
    for header in &matrix.column_headers {
        for key in &matrix.measure_keys {
            cells.push(quote(&format!("{}_{}", header.label, key)));
        }
    }
    for key in &matrix.measure_keys {
        cells.push(quote(&format!("Total_{}", key)));
    }
    cells.join(",")
}

fn grand_total_line(matrix: &PivotMatrix) -> String {
    let mut cells = Vec::new();
    if !matrix.row_fields.is_empty() {
        cells.push(quote(GRAND_TOTAL_LABEL));
        cells.extend((1..matrix.row_fields.len()).map(|_| quote("")));
    }
    for column in &matrix.column_totals {
        for value in column {
            cells.push(format_number(*value));
        }
    }
    for value in &matrix.grand_totals {
        cells.push(format_number(*value));
    }
    cells.join(",")
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Write the CSV export of `matrix` to `path`.
pub fn write_csv_file<P: AsRef<Path>>(matrix: &PivotMatrix, path: P) -> ExportResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, matrix_to_csv(matrix))?;
    Ok(())
}
