//! Unit conversion for measure source values.
//!
//! Conversions are linear and are applied to each numeric source value
//! before aggregation, so `avg`/`min`/`max` see converted inputs.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;

use super::aggregate::{aggregate, AggregationFunction};
use crate::models::{FieldValue, Record};

/// Square feet per square metre.
pub const SQFT_PER_SQM: f64 = 10.7639;

/// Base units per crore.
pub const UNITS_PER_CRORE: f64 = 10_000_000.0;

/// Physical dimension of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Area,
    /// Monetary amount.
    Amount,
}

/// Target unit of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetUnit {
    Ft2,
    M2,
    Crores,
    #[default]
    Original,
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "area" => Ok(Dimension::Area),
            "amount" | "currency" | "money" => Ok(Dimension::Amount),
            other => Err(format!("unknown dimension '{}'", other)),
        }
    }
}

impl FromStr for TargetUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ft2" | "sqft" => Ok(TargetUnit::Ft2),
            "m2" | "sqm" => Ok(TargetUnit::M2),
            "crores" | "cr" => Ok(TargetUnit::Crores),
            "original" => Ok(TargetUnit::Original),
            other => Err(format!("unknown unit '{}'", other)),
        }
    }
}

/// Conversion applied to one field: `{ field, type, targetUnit }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRule {
    pub field: String,
    #[serde(rename = "type")]
    pub dimension: Dimension,
    #[serde(rename = "targetUnit")]
    pub target_unit: TargetUnit,
}

impl ConversionRule {
    pub fn new(field: impl Into<String>, dimension: Dimension, target_unit: TargetUnit) -> Self {
        Self {
            field: field.into(),
            dimension,
            target_unit,
        }
    }

    pub fn convert(&self, value: f64) -> f64 {
        convert_value(value, self.dimension, self.target_unit)
    }
}

/// Convert a number. Unsupported dimension/unit pairs are the identity.
pub fn convert_value(value: f64, dimension: Dimension, unit: TargetUnit) -> f64 {
    match (dimension, unit) {
        (Dimension::Area, TargetUnit::Ft2) => value * SQFT_PER_SQM,
        (Dimension::Area, TargetUnit::M2) => value / SQFT_PER_SQM,
        (Dimension::Amount, TargetUnit::Crores) => value / UNITS_PER_CRORE,
        _ => value,
    }
}

/// Guess a field's dimension from its name.
pub fn detect_field_type(field_name: &str) -> Option<Dimension> {
    const AREA_KEYWORDS: [&str; 5] = ["area", "size", "sqft", "sqm", "square"];
    const AMOUNT_KEYWORDS: [&str; 6] = ["amount", "cost", "price", "sales", "revenue", "value"];

    let lower = field_name.to_lowercase();
    if AREA_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(Dimension::Area)
    } else if AMOUNT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Some(Dimension::Amount)
    } else {
        None
    }
}

/// Display a converted value with its unit (`1,234.5 ft²`, `₹12.5 cr`).
///
/// Digits are grouped the Indian way (`12,34,567`).
pub fn format_value_with_unit(value: f64, dimension: Dimension, unit: TargetUnit) -> String {
    match (dimension, unit) {
        (Dimension::Area, TargetUnit::Ft2) => format!("{} ft²", format_grouped(value, 2)),
        (Dimension::Area, _) => format!("{} m²", format_grouped(value, 2)),
        (Dimension::Amount, TargetUnit::Crores) => format!("₹{} cr", format_grouped(value, 2)),
        (Dimension::Amount, _) => format!("₹{}", format_grouped(value, 0)),
    }
}

/// Sum of `field` across `records` in its detected unit, or `None` when the
/// name suggests neither an area nor an amount.
pub fn field_total_with_unit(records: &[Record], field: &str) -> Option<String> {
    let dimension = detect_field_type(field)?;
    let total = aggregate(records.iter().map(|r| r.get(field)), AggregationFunction::Sum);
    Some(format_value_with_unit(total, dimension, TargetUnit::Original))
}

/// Round to at most `max_fraction` digits, drop trailing zeros, group the
/// integer part as lakh/crore.
fn format_grouped(value: f64, max_fraction: usize) -> String {
    let fixed = format!("{:.*}", max_fraction, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, f.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut grouped = String::new();
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        let remaining = len - i;
        if i > 0 && (remaining == 3 || (remaining > 3 && (remaining - 3) % 2 == 0)) {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && (int_part.bytes().any(|b| b != b'0') || !frac_part.is_empty());
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

/// Active conversion rules, at most one per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionSet {
    rules: Vec<ConversionRule>,
}

impl ConversionSet {
    /// Later rules for the same field replace earlier ones.
    pub fn new(rules: &[ConversionRule]) -> Self {
        let mut set = Self::default();
        for rule in rules {
            set.insert(rule.clone());
        }
        set
    }

    pub fn insert(&mut self, rule: ConversionRule) {
        match self.rules.iter_mut().find(|r| r.field == rule.field) {
            Some(slot) => *slot = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn remove_field(&mut self, field: &str) {
        self.rules.retain(|r| r.field != field);
    }

    pub fn get(&self, field: &str) -> Option<&ConversionRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    pub fn rules(&self) -> &[ConversionRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Conversion view of a record. Only numeric values are converted;
    /// rows untouched by any rule are borrowed as-is.
    pub fn apply<'a>(&self, record: &'a Record) -> Cow<'a, Record> {
        let touched = self
            .rules
            .iter()
            .any(|r| record.get(&r.field).as_number().is_some());
        if !touched {
            return Cow::Borrowed(record);
        }

        let mut converted = record.clone();
        for rule in &self.rules {
            if let Some(n) = record.get(&rule.field).as_number() {
                converted.set(rule.field.clone(), FieldValue::number(rule.convert(n)));
            }
        }
        Cow::Owned(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_area_conversions() {
        assert!((convert_value(10.0, Dimension::Area, TargetUnit::Ft2) - 107.639).abs() < 1e-9);
        assert!((convert_value(107.639, Dimension::Area, TargetUnit::M2) - 10.0).abs() < 1e-9);
        assert_eq!(convert_value(10.0, Dimension::Area, TargetUnit::Original), 10.0);
    }

    #[test]
    fn test_amount_conversions() {
        assert_eq!(convert_value(25_000_000.0, Dimension::Amount, TargetUnit::Crores), 2.5);
        assert_eq!(convert_value(5.0, Dimension::Amount, TargetUnit::Ft2), 5.0);
    }

    #[test]
    fn test_detect_field_type() {
        assert_eq!(detect_field_type("PlotArea"), Some(Dimension::Area));
        assert_eq!(detect_field_type("unit_sqft"), Some(Dimension::Area));
        assert_eq!(detect_field_type("Total Sales"), Some(Dimension::Amount));
        assert_eq!(detect_field_type("region"), None);
        // area keywords win
        assert_eq!(detect_field_type("area_value"), Some(Dimension::Area));
    }

    #[test]
    fn test_format_value_with_unit() {
        assert_eq!(format_value_with_unit(1234.5, Dimension::Area, TargetUnit::Ft2), "1,234.5 ft²");
        assert_eq!(format_value_with_unit(12.0, Dimension::Area, TargetUnit::M2), "12 m²");
        assert_eq!(format_value_with_unit(2.456, Dimension::Amount, TargetUnit::Crores), "₹2.46 cr");
        assert_eq!(format_value_with_unit(1234567.4, Dimension::Amount, TargetUnit::Original), "₹12,34,567");
        assert_eq!(format_value_with_unit(-1500.0, Dimension::Amount, TargetUnit::Original), "₹-1,500");
    }

    #[test]
    fn test_field_total_with_unit() {
        let records = vec![
            Record::new().with("plot_area", 1000.0).with("price", 1200000.0).with("city", "Pune"),
            Record::new().with("plot_area", 234567.5).with("price", "n/a").with("city", "Goa"),
            Record::new().with("price", 34567.0),
        ];
        assert_eq!(field_total_with_unit(&records, "plot_area").as_deref(), Some("2,35,567.5 m²"));
        assert_eq!(field_total_with_unit(&records, "price").as_deref(), Some("₹12,34,567"));
        assert_eq!(field_total_with_unit(&records, "city"), None);
    }

    #[test]
    fn test_one_rule_per_field() {
        let set = ConversionSet::new(&[
            ConversionRule::new("area", Dimension::Area, TargetUnit::Ft2),
            ConversionRule::new("area", Dimension::Area, TargetUnit::M2),
        ]);
        assert_eq!(set.rules().len(), 1);
        assert_eq!(set.get("area").map(|r| r.target_unit), Some(TargetUnit::M2));
    }

    #[test]
    fn test_apply_converts_numbers_only() {
        let set = ConversionSet::new(&[ConversionRule::new("sales", Dimension::Amount, TargetUnit::Crores)]);

        let numeric = Record::new().with("sales", 10_000_000.0);
        assert_eq!(set.apply(&numeric).get("sales").as_number(), Some(1.0));

        let text = Record::new().with("sales", "N/A");
        assert!(matches!(set.apply(&text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_rule_json_shape() {
        let rule: ConversionRule =
            serde_json::from_value(json!({ "field": "area", "type": "area", "targetUnit": "ft2" })).unwrap();
        assert_eq!(rule, ConversionRule::new("area", Dimension::Area, TargetUnit::Ft2));
    }
}
