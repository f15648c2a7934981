//! Measures: a source field paired with an aggregation function.

use serde::{Deserialize, Serialize};

use super::aggregate::AggregationFunction;

/// One measure of the pivot: `{ field, aggregation, label }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueField {
    #[serde(alias = "sourceField")]
    pub field: String,
    #[serde(default)]
    pub aggregation: AggregationFunction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ValueField {
    pub fn new(field: impl Into<String>, aggregation: AggregationFunction) -> Self {
        Self {
            field: field.into(),
            aggregation,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Stable identifier `{field}_{aggregation}`.
    pub fn measure_key(&self) -> String {
        measure_key(&self.field, self.aggregation)
    }

    /// Label, falling back to the source field name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.field)
    }
}

pub fn measure_key(field: &str, aggregation: AggregationFunction) -> String {
    format!("{}_{}", field, aggregation)
}

/// Drop measures whose key was already seen, keeping first occurrences in order.
pub fn dedupe_measures(measures: &[ValueField]) -> Vec<ValueField> {
    let mut seen = std::collections::HashSet::new();
    measures
        .iter()
        .filter(|m| seen.insert(m.measure_key()))
        .cloned()
        .collect()
}
