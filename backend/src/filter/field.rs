//! Categorical field filters.
//!
//! Each [`FieldFilterConfig`] is an allow-list for one field. Filters are
//! ANDed. An entry with an empty allow-list is "no constraint yet" and lets
//! every row through; it never excludes everything.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::Record;

/// Allow-list for one field: `{ "field": ..., "values": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldFilterConfig {
    pub field: String,
    #[serde(default, alias = "allowedValues")]
    pub values: Vec<String>,
}

impl FieldFilterConfig {
    pub fn new<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Add `value` to the allow-list, or remove it if already present.
    pub fn toggle(&mut self, value: &str) {
        match self.values.iter().position(|v| v == value) {
            Some(i) => {
                self.values.remove(i);
            }
            None => self.values.push(value.to_string()),
        }
    }
}

/// Compiled set of field filters.
#[derive(Debug, Clone, Default)]
pub struct FieldMatcher {
    constraints: Vec<(String, HashSet<String>)>,
}

impl FieldMatcher {
    pub fn new(configs: &[FieldFilterConfig]) -> Self {
        let constraints = configs
            .iter()
            .filter(|c| !c.values.is_empty())
            .map(|c| (c.field.clone(), c.values.iter().cloned().collect()))
            .collect();
        Self { constraints }
    }

    /// Row's string-coerced value must be allowed by every constraint.
    pub fn matches(&self, row: &Record) -> bool {
        self.constraints
            .iter()
            .all(|(field, allowed)| allowed.contains(&row.get(field).as_key_string()))
    }
}

/// Keep rows passing every field filter, in original order.
pub fn filter_by_fields(rows: &[Record], configs: &[FieldFilterConfig]) -> Vec<Record> {
    let matcher = FieldMatcher::new(configs);
    rows.iter().filter(|r| matcher.matches(r)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Record> {
        vec![
            Record::new().with("region", "N").with("product", "Apples").with("year", 2024.0),
            Record::new().with("region", "S").with("product", "Apples").with("year", 2025.0),
            Record::new().with("region", "N").with("product", "Pears").with("year", 2025.0),
        ]
    }

    #[test]
    fn test_no_filters_is_identity() {
        assert_eq!(filter_by_fields(&rows(), &[]), rows());
    }

    #[test]
    fn test_empty_allow_list_passes_everything() {
        let filters = vec![FieldFilterConfig::new("region", Vec::<String>::new())];
        assert_eq!(filter_by_fields(&rows(), &filters).len(), 3);
    }

    #[test]
    fn test_filters_are_anded() {
        let filters = vec![
            FieldFilterConfig::new("region", ["N"]),
            FieldFilterConfig::new("product", ["Pears", "Plums"]),
        ];
        let kept = filter_by_fields(&rows(), &filters);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].get("product").as_key_string(), "Pears");
    }

    #[test]
    fn test_numbers_compare_as_strings() {
        let filters = vec![FieldFilterConfig::new("year", ["2025"])];
        assert_eq!(filter_by_fields(&rows(), &filters).len(), 2);
    }

    #[test]
    fn test_missing_field_matches_only_empty_string() {
        let filters = vec![FieldFilterConfig::new("color", ["red"])];
        assert!(filter_by_fields(&rows(), &filters).is_empty());

        let filters = vec![FieldFilterConfig::new("color", [""])];
        assert_eq!(filter_by_fields(&rows(), &filters).len(), 3);
    }

    #[test]
    fn test_toggle_value() {
        let mut filter = FieldFilterConfig::new("region", ["N"]);
        filter.toggle("S");
        assert_eq!(filter.values, vec!["N", "S"]);
        filter.toggle("N");
        assert_eq!(filter.values, vec!["S"]);
    }

    #[test]
    fn test_accepts_allowed_values_alias() {
        let filter: FieldFilterConfig =
            serde_json::from_value(json!({ "field": "region", "allowedValues": ["N"] })).unwrap();
        assert_eq!(filter.values, vec!["N"]);
    }
}
