//! Parsers for compact command-line pivot arguments.
//!
//! | Flag        | Form                                   |
//! |-------------|----------------------------------------|
//! | `--measure` | `field` or `field:agg`                 |
//! | `--convert` | `field:dimension:unit`                 |
//! | `--date`    | `all`, `kind=value`, `range=from..to`  |
//! | `--filter`  | `field=v1,v2`                          |
//! | `--sort`    | `field` or `field:desc`                |

use crate::error::{SessionError, SessionResult};
use crate::filter::{DateFilterConfig, DateFilterKind, FieldFilterConfig, RelativeRange};
use crate::pivot::{AggregationFunction, ConversionRule, Dimension, SortKey, TargetUnit, ValueField};

fn invalid(msg: impl Into<String>) -> SessionError {
    SessionError::InvalidArgument(msg.into())
}

/// `sales` or `sales:avg`.
pub fn parse_measure(raw: &str) -> SessionResult<ValueField> {
    let (field, agg) = match raw.split_once(':') {
        Some((f, a)) => (f.trim(), a.parse::<AggregationFunction>().map_err(invalid)?),
        None => (raw.trim(), AggregationFunction::Sum),
    };
    if field.is_empty() {
        return Err(invalid(format!("measure '{}' has no field", raw)));
    }
    Ok(ValueField::new(field, agg))
}

/// `area:area:ft2`.
pub fn parse_conversion(raw: &str) -> SessionResult<ConversionRule> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    match parts.as_slice() {
        [field, dimension, unit] if !field.is_empty() => Ok(ConversionRule::new(
            *field,
            dimension.parse::<Dimension>().map_err(invalid)?,
            unit.parse::<TargetUnit>().map_err(invalid)?,
        )),
        _ => Err(invalid(format!("conversion '{}' must be field:dimension:unit", raw))),
    }
}

/// `month=2025-07`, `range=2025-01-01..2025-03-31`, `relative=thisYear`, `all`.
pub fn parse_date_filter(raw: &str) -> SessionResult<DateFilterConfig> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return Ok(DateFilterConfig::all());
    }

    let (kind, value) = raw
        .split_once('=')
        .ok_or_else(|| invalid(format!("date filter '{}' must be kind=value", raw)))?;
    let kind: DateFilterKind = serde_json::from_value(serde_json::Value::String(kind.trim().to_lowercase()))
        .map_err(|_| invalid(format!("unknown date filter kind '{}'", kind)))?;
    let value = value.trim();

    Ok(match kind {
        DateFilterKind::All => DateFilterConfig::all(),
        DateFilterKind::Date => DateFilterConfig::date(value),
        DateFilterKind::Week => DateFilterConfig::week(value),
        DateFilterKind::Month => DateFilterConfig::month(value),
        DateFilterKind::Year => DateFilterConfig::year(value),
        DateFilterKind::Range => {
            let (from, to) = value
                .split_once("..")
                .ok_or_else(|| invalid(format!("range '{}' must be from..to", value)))?;
            DateFilterConfig::range(from.trim(), to.trim())
        }
        DateFilterKind::Relative => {
            let range = RelativeRange::parse(value)
                .ok_or_else(|| invalid(format!("unknown relative range '{}'", value)))?;
            DateFilterConfig::relative(range)
        }
    })
}

/// `region=North,South`. `region=` is an empty allow-list.
pub fn parse_field_filter(raw: &str) -> SessionResult<FieldFilterConfig> {
    let (field, values) = raw
        .split_once('=')
        .ok_or_else(|| invalid(format!("filter '{}' must be field=v1,v2", raw)))?;
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty());
    Ok(FieldFilterConfig::new(field.trim(), values))
}

/// `region` or `region:desc`.
pub fn parse_sort(raw: &str) -> SessionResult<SortKey> {
    match raw.split_once(':') {
        None => Ok(SortKey::asc(raw.trim())),
        Some((field, dir)) => match dir.trim().to_lowercase().as_str() {
            "asc" => Ok(SortKey::asc(field.trim())),
            "desc" => Ok(SortKey::desc(field.trim())),
            other => Err(invalid(format!("unknown sort direction '{}'", other))),
        },
    }
}

/// Split comma-separated field lists, dropping blanks.
pub fn parse_field_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
