//! Chart-ready series derived from a matrix.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::pivot::{join_key, PivotMatrix};

/// One pie slice: a measure and its grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
}

/// Which chart to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
}

/// One object per matrix row: `name`, the group values by field, then the
/// row total of every measure.
pub fn bar_series(matrix: &PivotMatrix) -> Vec<Value> {
    matrix
        .rows
        .iter()
        .map(|row| {
            let mut point = Map::new();
            point.insert("name".to_string(), Value::String(join_key(&row.group_key)));
            for (field, value) in matrix.row_fields.iter().zip(&row.group_key) {
                point.insert(field.clone(), serde_json::to_value(value).unwrap_or(Value::Null));
            }
            for (m, key) in matrix.measure_keys.iter().enumerate() {
                point.insert(key.clone(), number(row.total(m)));
            }
            Value::Object(point)
        })
        .collect()
}

/// One slice per measure key.
pub fn pie_series(matrix: &PivotMatrix) -> Vec<PieSlice> {
    matrix
        .measure_keys
        .iter()
        .zip(&matrix.grand_totals)
        .map(|(key, total)| PieSlice {
            name: key.clone(),
            value: *total,
        })
        .collect()
}

/// Series for `kind` as JSON.
pub fn chart_series(matrix: &PivotMatrix, kind: ChartKind) -> Value {
    match kind {
        ChartKind::Bar => Value::Array(bar_series(matrix)),
        ChartKind::Pie => serde_json::to_value(pie_series(matrix)).unwrap_or(Value::Null),
    }
}

fn number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
