//! Aggregation primitive: reduce a sequence of cell values to one number.
//!
//! Non-numeric values are discarded, never coerced. An empty numeric input
//! yields `0` for every function, including `min`, `max` and `avg`, so that
//! every row-group/column intersection has a well-defined cell.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::FieldValue;

/// Named aggregation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationFunction {
    #[default]
    Sum,
    /// Number of numeric values.
    Count,
    Avg,
    Min,
    Max,
}

impl AggregationFunction {
    pub const ALL: [AggregationFunction; 5] = [
        AggregationFunction::Sum,
        AggregationFunction::Count,
        AggregationFunction::Avg,
        AggregationFunction::Min,
        AggregationFunction::Max,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregationFunction::Sum => "sum",
            AggregationFunction::Count => "count",
            AggregationFunction::Avg => "avg",
            AggregationFunction::Min => "min",
            AggregationFunction::Max => "max",
        }
    }
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(AggregationFunction::Sum),
            "count" => Ok(AggregationFunction::Count),
            "avg" | "average" | "mean" => Ok(AggregationFunction::Avg),
            "min" => Ok(AggregationFunction::Min),
            "max" => Ok(AggregationFunction::Max),
            other => Err(format!("unknown aggregation '{}'", other)),
        }
    }
}

/// Running state for one cell, fed in input order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
    sum: f64,
    count: usize,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one value; non-numeric values are skipped.
    pub fn push(&mut self, value: &FieldValue) {
        if let Some(n) = value.as_number() {
            self.push_number(n);
        }
    }

    pub fn push_number(&mut self, n: f64) {
        self.sum += n;
        self.count += 1;
        self.min = Some(self.min.map_or(n, |m| m.min(n)));
        self.max = Some(self.max.map_or(n, |m| m.max(n)));
    }

    /// Number of numeric values seen.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finish(&self, func: AggregationFunction) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        match func {
            AggregationFunction::Sum => self.sum,
            AggregationFunction::Count => self.count as f64,
            AggregationFunction::Avg => self.sum / self.count as f64,
            AggregationFunction::Min => self.min.unwrap_or(0.0),
            AggregationFunction::Max => self.max.unwrap_or(0.0),
        }
    }
}

/// Aggregate `values` under `func`.
pub fn aggregate<'a, I>(values: I, func: AggregationFunction) -> f64
where
    I: IntoIterator<Item = &'a FieldValue>,
{
    let mut acc = Accumulator::new();
    for value in values {
        acc.push(value);
    }
    acc.finish(func)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(raw: &[Option<f64>]) -> Vec<FieldValue> {
        raw.iter()
            .map(|v| match v {
                Some(n) => FieldValue::number(*n),
                None => FieldValue::text("N/A"),
            })
            .collect()
    }

    #[test]
    fn test_non_numeric_discarded() {
        let vals = values(&[Some(10.0), None, Some(30.0)]);
        assert_eq!(aggregate(&vals, AggregationFunction::Avg), 20.0);
        assert_eq!(aggregate(&vals, AggregationFunction::Sum), 40.0);
        assert_eq!(aggregate(&vals, AggregationFunction::Count), 2.0);
        assert_eq!(aggregate(&vals, AggregationFunction::Min), 10.0);
        assert_eq!(aggregate(&vals, AggregationFunction::Max), 30.0);
    }

    #[test]
    fn test_empty_input_defaults_to_zero() {
        let empty: Vec<FieldValue> = Vec::new();
        let text_only = values(&[None, None]);
        for func in AggregationFunction::ALL {
            assert_eq!(aggregate(&empty, func), 0.0, "{}", func);
            assert_eq!(aggregate(&text_only, func), 0.0, "{}", func);
        }
    }

    #[test]
    fn test_numeric_looking_text_is_not_coerced() {
        let vals = vec![FieldValue::text("30"), FieldValue::number(10.0), FieldValue::Null];
        assert_eq!(aggregate(&vals, AggregationFunction::Sum), 10.0);
    }

    #[test]
    fn test_negative_extrema() {
        let vals = values(&[Some(-5.0), Some(-1.0), Some(-9.0)]);
        assert_eq!(aggregate(&vals, AggregationFunction::Min), -9.0);
        assert_eq!(aggregate(&vals, AggregationFunction::Max), -1.0);
    }

    #[test]
    fn test_parse_function_names() {
        assert_eq!("AVG".parse::<AggregationFunction>(), Ok(AggregationFunction::Avg));
        assert_eq!("count".parse::<AggregationFunction>(), Ok(AggregationFunction::Count));
        assert!("median".parse::<AggregationFunction>().is_err());
    }
}
