//! Domain models for flat record sets.
//!
//! - [`FieldValue`] - Tagged cell value (null, number or text)
//! - [`Record`] - One row: ordered field name → value pairs
//! - [`Dataset`] - The fully materialized input table
//!
//! Values are typed once, at ingestion. Everything downstream (filters,
//! conversions, aggregation) pattern-matches on [`FieldValue`] instead of
//! probing runtime types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::DatasetError;

/// Name of the distinguished date field.
pub const DATE_FIELD: &str = "date";

// =============================================================================
// Field Value
// =============================================================================

/// A single cell of a record.
#[derive(Debug, Clone, Default)]
pub enum FieldValue {
    /// Missing key or explicit null.
    #[default]
    Null,
    /// Finite number.
    Number(f64),
    /// Categorical / free-form text.
    Text(String),
}

impl FieldValue {
    /// Build a number value, mapping non-finite input to `Null`.
    pub fn number(n: f64) -> Self {
        if n.is_finite() {
            // -0.0 and 0.0 must group together
            FieldValue::Number(if n == 0.0 { 0.0 } else { n })
        } else {
            FieldValue::Null
        }
    }

    /// Build a text value.
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    /// Numeric payload, if any. Text is never coerced.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// String coercion used by field filters and display labels.
    ///
    /// Numbers print in shortest round-trip form (`100`, `1.5`); `Null`
    /// prints as the empty string.
    pub fn as_key_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Number(_) => 1,
            FieldValue::Text(_) => 2,
        }
    }
}

/// Shortest round-trip rendering of a number (`100`, not `100.0`).
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key_string())
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            FieldValue::Null => {}
            FieldValue::Number(n) => n.to_bits().hash(state),
            FieldValue::Text(s) => s.hash(state),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Native ordering: `Null` < numbers (numeric order) < text (lexicographic).
impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Number(n) => n.as_f64().map(FieldValue::number).unwrap_or_default(),
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Bool(b) => FieldValue::Text(b.to_string()),
            // Nested structures are not pivotable; keep their JSON text
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(FieldValue::from(&value))
    }
}

// =============================================================================
// Record
// =============================================================================

static NULL_VALUE: FieldValue = FieldValue::Null;

/// One row of the data set, keeping field insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Insert or replace a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Value of `field`, `Null` when absent.
    pub fn get(&self, field: &str) -> &FieldValue {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
            .unwrap_or(&NULL_VALUE)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == field)
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build from a JSON object. Non-objects yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            fields: obj
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::from(v)))
                .collect(),
        })
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.set(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Record::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom("record must be a JSON object"))
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// A fully materialized record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parse a JSON array of objects.
    pub fn from_json(value: &Value) -> Result<Self, DatasetError> {
        let items = value.as_array().ok_or(DatasetError::NotAnArray)?;
        let records = items
            .iter()
            .enumerate()
            .map(|(i, item)| Record::from_json(item).ok_or(DatasetError::NotAnObject(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }

    /// Parse a JSON string holding an array of objects.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Union of field names across all records, first-seen order, `date`
    /// excluded.
    pub fn fields(&self) -> Vec<String> {
        fields_of(&self.records)
    }

    /// Fields holding a number in at least one record.
    pub fn numeric_fields(&self) -> Vec<String> {
        numeric_fields_of(&self.records)
    }

    /// Sorted distinct string-coerced values of `field`.
    pub fn unique_values(&self, field: &str) -> Vec<String> {
        unique_values_of(&self.records, field)
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

/// Union of field names across `records`, `date` excluded.
pub fn fields_of(records: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for name in records.iter().flat_map(|r| r.field_names()) {
        if name != DATE_FIELD && seen.insert(name) {
            fields.push(name.to_string());
        }
    }
    fields
}

/// Fields with at least one numeric value in `records`.
pub fn numeric_fields_of(records: &[Record]) -> Vec<String> {
    fields_of(records)
        .into_iter()
        .filter(|f| records.iter().any(|r| r.get(f).as_number().is_some()))
        .collect()
}

/// Sorted distinct string-coerced values of `field` in `records`.
pub fn unique_values_of(records: &[Record], field: &str) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get(field).as_key_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
