//! Matrix builder: group rows by composite row and column keys, aggregate
//! every measure per cell, and accumulate totals.
//!
//! Row keys are tuples of [`FieldValue`]s, never delimiter-joined strings, so
//! values containing `|` cannot collide. Columns are bucketed by their
//! rendered label, in which `|` and `\` inside values are escaped. A number
//! and a text with the same string form (`2024` and `"2024"`) therefore share
//! one column, the same as they would in an exported CSV.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::aggregate::Accumulator;
use super::conversion::{ConversionRule, ConversionSet};
use super::measure::{dedupe_measures, ValueField};
use crate::models::{FieldValue, Record};

/// Label of the single column when no column fields are selected.
pub const TOTAL_COLUMN: &str = "Total";

/// Separator used when rendering composite keys as labels.
pub const KEY_SEPARATOR: &str = "|";

/// Composite group key, one value per grouping field.
pub type GroupKey = Vec<FieldValue>;

/// One column bucket of the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub key: GroupKey,
    pub label: String,
}

impl ColumnHeader {
    fn total() -> Self {
        Self {
            key: Vec::new(),
            label: TOTAL_COLUMN.to_string(),
        }
    }
}

/// One row group of the matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRow {
    pub group_key: GroupKey,
    /// Cell values indexed `[column][measure]`.
    pub cells: Vec<Vec<f64>>,
    /// Row totals indexed by measure.
    pub totals: Vec<f64>,
}

impl PivotRow {
    pub fn cell(&self, column: usize, measure: usize) -> f64 {
        self.cells
            .get(column)
            .and_then(|c| c.get(measure))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn total(&self, measure: usize) -> f64 {
        self.totals.get(measure).copied().unwrap_or(0.0)
    }
}

/// Engine output. Recomputed from scratch, never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotMatrix {
    pub row_fields: Vec<String>,
    pub column_fields: Vec<String>,
    pub measures: Vec<ValueField>,
    pub measure_keys: Vec<String>,
    pub column_headers: Vec<ColumnHeader>,
    pub rows: Vec<PivotRow>,
    /// Indexed `[column][measure]`.
    pub column_totals: Vec<Vec<f64>>,
    pub grand_totals: Vec<f64>,
}

impl PivotMatrix {
    pub fn measure_index(&self, measure_key: &str) -> Option<usize> {
        self.measure_keys.iter().position(|k| k == measure_key)
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.column_headers.iter().position(|h| h.label == label)
    }

    pub fn row_field_index(&self, field: &str) -> Option<usize> {
        self.row_fields.iter().position(|f| f == field)
    }

    /// Value of `field` in a row's group key.
    pub fn group_value<'a>(&self, row: &'a PivotRow, field: &str) -> Option<&'a FieldValue> {
        self.row_field_index(field).and_then(|i| row.group_key.get(i))
    }

    /// First row whose group key renders as `values`.
    pub fn find_row(&self, values: &[&str]) -> Option<&PivotRow> {
        self.rows.iter().find(|row| {
            row.group_key.len() == values.len()
                && row
                    .group_key
                    .iter()
                    .zip(values)
                    .all(|(v, want)| v.as_key_string() == *want)
        })
    }

    /// Cell lookup by column label and measure key.
    pub fn cell(&self, row: &PivotRow, column_label: &str, measure_key: &str) -> Option<f64> {
        let c = self.column_index(column_label)?;
        let m = self.measure_index(measure_key)?;
        Some(row.cell(c, m))
    }

    pub fn column_total(&self, column_label: &str, measure_key: &str) -> Option<f64> {
        let c = self.column_index(column_label)?;
        let m = self.measure_index(measure_key)?;
        self.column_totals.get(c).and_then(|t| t.get(m)).copied()
    }

    pub fn grand_total(&self, measure_key: &str) -> Option<f64> {
        let m = self.measure_index(measure_key)?;
        self.grand_totals.get(m).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Row, column and grand totals as running sums of per-cell aggregates.
///
/// For `avg`, `min` and `max` measures a total is the sum of the cell
/// results, not the aggregate recomputed over the underlying rows.
#[derive(Debug, Clone)]
pub struct SumOfCellAggregates {
    column_totals: Vec<Vec<f64>>,
    grand_totals: Vec<f64>,
}

impl SumOfCellAggregates {
    pub fn new(columns: usize, measures: usize) -> Self {
        Self {
            column_totals: vec![vec![0.0; measures]; columns],
            grand_totals: vec![0.0; measures],
        }
    }

    /// Add one row's cells (`[column][measure]`) and return its row totals.
    pub fn add_row(&mut self, cells: &[Vec<f64>]) -> Vec<f64> {
        let mut row_totals = vec![0.0; self.grand_totals.len()];
        for (c, column) in cells.iter().enumerate() {
            for (m, value) in column.iter().enumerate() {
                row_totals[m] += value;
                self.column_totals[c][m] += value;
                self.grand_totals[m] += value;
            }
        }
        row_totals
    }

    pub fn finish(self) -> (Vec<Vec<f64>>, Vec<f64>) {
        (self.column_totals, self.grand_totals)
    }
}

struct GroupBucket {
    key: GroupKey,
    cells: Vec<Vec<Accumulator>>,
}

/// Build the pivot matrix for already-filtered rows.
pub fn build_matrix(
    rows: &[Record],
    row_fields: &[String],
    column_fields: &[String],
    measures: &[ValueField],
    conversions: &[ConversionRule],
) -> PivotMatrix {
    let measures = dedupe_measures(measures);
    let measure_keys: Vec<String> = measures.iter().map(ValueField::measure_key).collect();
    let conversions = ConversionSet::new(conversions);
    let view: Vec<_> = rows.iter().map(|r| conversions.apply(r)).collect();

    let column_headers = column_headers(view.iter().map(|r| &**r), column_fields);
    let column_lookup: HashMap<&str, usize> = column_headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.label.as_str(), i))
        .collect();

    let mut groups: Vec<GroupBucket> = Vec::new();
    let mut group_lookup: HashMap<GroupKey, usize> = HashMap::new();

    for row in &view {
        let row: &Record = row;
        let row_key = key_of(row, row_fields);
        let g = match group_lookup.get(&row_key) {
            Some(&g) => g,
            None => {
                groups.push(GroupBucket {
                    key: row_key.clone(),
                    cells: vec![vec![Accumulator::new(); measures.len()]; column_headers.len()],
                });
                group_lookup.insert(row_key, groups.len() - 1);
                groups.len() - 1
            }
        };

        let c = if column_fields.is_empty() {
            0
        } else {
            let label = join_key(&key_of(row, column_fields));
            match column_lookup.get(label.as_str()) {
                Some(&c) => c,
                None => continue,
            }
        };

        for (m, measure) in measures.iter().enumerate() {
            groups[g].cells[c][m].push(row.get(&measure.field));
        }
    }

    let mut totals = SumOfCellAggregates::new(column_headers.len(), measures.len());
    let pivot_rows: Vec<PivotRow> = groups
        .into_iter()
        .map(|group| {
            let cells: Vec<Vec<f64>> = group
                .cells
                .iter()
                .map(|column| {
                    column
                        .iter()
                        .zip(&measures)
                        .map(|(acc, measure)| acc.finish(measure.aggregation))
                        .collect()
                })
                .collect();
            let row_totals = totals.add_row(&cells);
            PivotRow {
                group_key: group.key,
                cells,
                totals: row_totals,
            }
        })
        .collect();
    let (column_totals, grand_totals) = totals.finish();

    PivotMatrix {
        row_fields: row_fields.to_vec(),
        column_fields: column_fields.to_vec(),
        measures,
        measure_keys,
        column_headers,
        rows: pivot_rows,
        column_totals,
        grand_totals,
    }
}

/// Distinct column labels seen across `rows`, sorted, or the `Total` sentinel.
///
/// Keys that render to the same label share a header; its `key` is the
/// smallest of them.
pub fn column_headers<'a, I>(rows: I, column_fields: &[String]) -> Vec<ColumnHeader>
where
    I: IntoIterator<Item = &'a Record>,
{
    if column_fields.is_empty() {
        return vec![ColumnHeader::total()];
    }

    let mut by_label: BTreeMap<String, GroupKey> = BTreeMap::new();
    for row in rows {
        let key = key_of(row, column_fields);
        let label = join_key(&key);
        match by_label.get_mut(&label) {
            Some(existing) if key < *existing => *existing = key,
            Some(_) => {}
            None => {
                by_label.insert(label, key);
            }
        }
    }
    by_label
        .into_iter()
        .map(|(label, key)| ColumnHeader { key, label })
        .collect()
}

fn key_of(row: &Record, fields: &[String]) -> GroupKey {
    fields.iter().map(|f| row.get(f).clone()).collect()
}

/// Render a composite key as `a|b|c`, escaping `\` and `|` inside values.
pub fn join_key(key: &[FieldValue]) -> String {
    key.iter()
        .map(|v| escape_label_part(&v.as_key_string()))
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

fn escape_label_part(part: &str) -> String {
    if !part.contains(['\\', '|']) {
        return part.to_string();
    }
    let mut out = String::with_capacity(part.len() + 2);
    for ch in part.chars() {
        if ch == '\\' || ch == '|' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
