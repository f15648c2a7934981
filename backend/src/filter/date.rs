//! Date filter on the distinguished `date` field.
//!
//! | Kind       | Value              | Row passes when                              |
//! |------------|--------------------|----------------------------------------------|
//! | `all`      | -                  | always                                       |
//! | `date`     | `YYYY-MM-DD`       | row date equals the value                    |
//! | `range`    | `{from, to}`       | row date in `[from, to]`                     |
//! | `week`     | `YYYY-WW`          | ISO year and ISO week both match             |
//! | `month`    | `YYYY-MM`          | row date inside that calendar month          |
//! | `year`     | `YYYY`             | row date inside that calendar year           |
//! | `relative` | `last7days`, `thisMonth`, `thisYear` | evaluated against today    |
//!
//! A missing or empty value is the identity, like `all`. Any other
//! malformed value matches no rows. Unparseable row dates never match.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{FieldValue, Record, DATE_FIELD};

static YEAR_PART_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,4})-(\d{1,2})$").expect("valid regex"));

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));

/// Which date rule is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFilterKind {
    #[default]
    All,
    /// Single calendar day.
    Date,
    /// Inclusive day range.
    Range,
    Week,
    Month,
    Year,
    Relative,
}

/// Quick ranges relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativeRange {
    #[serde(rename = "last7days")]
    Last7Days,
    #[serde(rename = "thisMonth")]
    ThisMonth,
    #[serde(rename = "thisYear")]
    ThisYear,
}

impl RelativeRange {
    pub fn as_str(self) -> &'static str {
        match self {
            RelativeRange::Last7Days => "last7days",
            RelativeRange::ThisMonth => "thisMonth",
            RelativeRange::ThisYear => "thisYear",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "last7days" => Some(RelativeRange::Last7Days),
            "thisMonth" => Some(RelativeRange::ThisMonth),
            "thisYear" => Some(RelativeRange::ThisYear),
            _ => None,
        }
    }
}

/// Payload of a date filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateFilterValue {
    Range { from: String, to: String },
    Text(String),
}

/// Date filter as stored in report configs: `{ "type": ..., "value": ... }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DateFilterConfig {
    #[serde(rename = "type")]
    pub kind: DateFilterKind,
    #[serde(default)]
    pub value: Option<DateFilterValue>,
}

impl DateFilterConfig {
    pub fn all() -> Self {
        Self::default()
    }

    fn text(kind: DateFilterKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: Some(DateFilterValue::Text(value.into())),
        }
    }

    /// Single day, `YYYY-MM-DD`.
    pub fn date(value: impl Into<String>) -> Self {
        Self::text(DateFilterKind::Date, value)
    }

    /// ISO week, `YYYY-WW`.
    pub fn week(value: impl Into<String>) -> Self {
        Self::text(DateFilterKind::Week, value)
    }

    /// Calendar month, `YYYY-MM`.
    pub fn month(value: impl Into<String>) -> Self {
        Self::text(DateFilterKind::Month, value)
    }

    /// Calendar year, `YYYY`.
    pub fn year(value: impl Into<String>) -> Self {
        Self::text(DateFilterKind::Year, value)
    }

    pub fn relative(range: RelativeRange) -> Self {
        Self::text(DateFilterKind::Relative, range.as_str())
    }

    /// Inclusive range of days.
    pub fn range(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind: DateFilterKind::Range,
            value: Some(DateFilterValue::Range {
                from: from.into(),
                to: to.into(),
            }),
        }
    }

    /// Whether this filter lets every row through.
    pub fn is_identity(&self) -> bool {
        match (&self.kind, &self.value) {
            (DateFilterKind::All, _) | (_, None) => true,
            (_, Some(DateFilterValue::Text(s))) => s.trim().is_empty(),
            (_, Some(DateFilterValue::Range { .. })) => false,
        }
    }

    /// Resolve the filter into a row predicate, with relative ranges
    /// anchored on `today`.
    pub fn matcher(&self, today: NaiveDate) -> DateMatcher {
        if self.is_identity() {
            return DateMatcher::Any;
        }

        let resolved = match (&self.kind, &self.value) {
            (DateFilterKind::Date, Some(DateFilterValue::Text(s))) => {
                parse_date(s).map(|d| (d, d))
            }
            (DateFilterKind::Range, Some(DateFilterValue::Range { from, to })) => {
                parse_date(from).zip(parse_date(to))
            }
            (DateFilterKind::Week, Some(DateFilterValue::Text(s))) => {
                return parse_week(s)
                    .map(|(year, week)| DateMatcher::IsoWeek { year, week })
                    .unwrap_or(DateMatcher::Nothing);
            }
            (DateFilterKind::Month, Some(DateFilterValue::Text(s))) => {
                parse_month(s).and_then(|(y, m)| month_bounds(y, m))
            }
            (DateFilterKind::Year, Some(DateFilterValue::Text(s))) => {
                parse_year(s).and_then(year_bounds)
            }
            (DateFilterKind::Relative, Some(DateFilterValue::Text(s))) => {
                RelativeRange::parse(s.trim()).and_then(|r| relative_bounds(r, today))
            }
            _ => None,
        };

        match resolved {
            Some((start, end)) => DateMatcher::Between { start, end },
            None => DateMatcher::Nothing,
        }
    }
}

/// Resolved date predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMatcher {
    Any,
    Nothing,
    Between { start: NaiveDate, end: NaiveDate },
    IsoWeek { year: i32, week: u32 },
}

impl DateMatcher {
    pub fn matches(&self, row: &Record) -> bool {
        match self {
            DateMatcher::Any => true,
            DateMatcher::Nothing => false,
            DateMatcher::Between { start, end } => {
                parse_row_date(row).is_some_and(|d| *start <= d && d <= *end)
            }
            DateMatcher::IsoWeek { year, week } => parse_row_date(row).is_some_and(|d| {
                let iso = d.iso_week();
                iso.year() == *year && iso.week() == *week
            }),
        }
    }
}

/// Filter `rows` by `config`, reading today's date from the local clock.
pub fn filter_by_date(rows: &[Record], config: &DateFilterConfig) -> Vec<Record> {
    filter_by_date_at(rows, config, chrono::Local::now().date_naive())
}

/// Filter `rows` by `config` with an explicit `today`.
pub fn filter_by_date_at(rows: &[Record], config: &DateFilterConfig, today: NaiveDate) -> Vec<Record> {
    let matcher = config.matcher(today);
    rows.iter().filter(|r| matcher.matches(r)).cloned().collect()
}

/// Calendar date of a row's `date` field, time of day ignored.
pub fn parse_row_date(row: &Record) -> Option<NaiveDate> {
    match row.get(DATE_FIELD) {
        FieldValue::Text(s) => parse_date(s),
        _ => None,
    }
}

/// Parse `YYYY-MM-DD`, an RFC 3339 timestamp, or a naive timestamp.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok()
                .map(|dt| dt.date())
        })
}

fn parse_year_part(s: &str) -> Option<(i32, u32)> {
    let caps = YEAR_PART_RE.captures(s.trim())?;
    let year = caps[1].parse().ok()?;
    let part = caps[2].parse().ok()?;
    Some((year, part))
}

fn parse_week(s: &str) -> Option<(i32, u32)> {
    parse_year_part(s).filter(|(_, week)| (1..=53).contains(week))
}

fn parse_month(s: &str) -> Option<(i32, u32)> {
    parse_year_part(s).filter(|(_, month)| (1..=12).contains(month))
}

fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    if YEAR_RE.is_match(s) {
        s.parse().ok()
    } else {
        None
    }
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

fn relative_bounds(range: RelativeRange, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    match range {
        RelativeRange::Last7Days => Some((today - Duration::days(7), today)),
        RelativeRange::ThisMonth => month_bounds(today.year(), today.month()),
        RelativeRange::ThisYear => year_bounds(today.year()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dated(dates: &[&str]) -> Vec<Record> {
        dates.iter().map(|d| Record::new().with("date", *d)).collect()
    }

    fn dates_of(rows: &[Record]) -> Vec<String> {
        rows.iter().map(|r| r.get("date").as_key_string()).collect()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_all_is_identity() {
        let rows = dated(&["2025-07-01", "garbage"]);
        assert_eq!(filter_by_date_at(&rows, &DateFilterConfig::all(), day(2025, 7, 1)), rows);
    }

    #[test]
    fn test_empty_value_is_identity() {
        let rows = dated(&["2025-07-01", "2024-01-01"]);
        let config = DateFilterConfig::month("");
        assert_eq!(filter_by_date_at(&rows, &config, day(2025, 7, 1)).len(), 2);

        let null_value = DateFilterConfig { kind: DateFilterKind::Week, value: None };
        assert_eq!(filter_by_date_at(&rows, &null_value, day(2025, 7, 1)).len(), 2);
    }

    #[test]
    fn test_exact_date_ignores_time_of_day() {
        let rows = dated(&["2025-07-01", "2025-07-01T18:30:00Z", "2025-07-02"]);
        let kept = filter_by_date_at(&rows, &DateFilterConfig::date("2025-07-01"), day(2025, 1, 1));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_range_is_inclusive() {
        let rows = dated(&["2025-06-30", "2025-07-01", "2025-07-10", "2025-07-11"]);
        let config = DateFilterConfig::range("2025-07-01", "2025-07-10");
        let kept = filter_by_date_at(&rows, &config, day(2025, 1, 1));
        assert_eq!(dates_of(&kept), vec!["2025-07-01", "2025-07-10"]);
    }

    #[test]
    fn test_week_uses_iso_numbering() {
        // 2024-12-30 belongs to ISO week 2025-01
        let rows = dated(&["2024-12-29", "2024-12-30", "2025-01-05", "2025-01-06"]);
        let kept = filter_by_date_at(&rows, &DateFilterConfig::week("2025-1"), day(2025, 1, 1));
        assert_eq!(dates_of(&kept), vec!["2024-12-30", "2025-01-05"]);
    }

    #[test]
    fn test_month_bounds() {
        let rows = dated(&["2024-02-01", "2024-02-29", "2024-03-01", "2024-01-31"]);
        let kept = filter_by_date_at(&rows, &DateFilterConfig::month("2024-02"), day(2025, 1, 1));
        assert_eq!(dates_of(&kept), vec!["2024-02-01", "2024-02-29"]);

        let dec = filter_by_date_at(&dated(&["2024-12-31"]), &DateFilterConfig::month("2024-12"), day(2025, 1, 1));
        assert_eq!(dec.len(), 1);
    }

    #[test]
    fn test_year_bounds() {
        let rows = dated(&["2024-12-31", "2025-01-01", "2025-12-31", "2026-01-01"]);
        let kept = filter_by_date_at(&rows, &DateFilterConfig::year("2025"), day(2025, 1, 1));
        assert_eq!(dates_of(&kept), vec!["2025-01-01", "2025-12-31"]);
    }

    #[test]
    fn test_malformed_values_match_nothing() {
        let rows = dated(&["2025-07-01"]);
        let today = day(2025, 7, 1);
        for config in [
            DateFilterConfig::week("2025-xx"),
            DateFilterConfig::month("July"),
            DateFilterConfig::month("2025-13"),
            DateFilterConfig::year("20x5"),
            DateFilterConfig::date("yesterday"),
            DateFilterConfig::range("2025-07-01", "soon"),
            DateFilterConfig { kind: DateFilterKind::Relative, value: Some(DateFilterValue::Text("lastDecade".into())) },
        ] {
            assert!(filter_by_date_at(&rows, &config, today).is_empty(), "{:?}", config);
        }
    }

    #[test]
    fn test_unparseable_row_dates_never_match() {
        let rows = vec![
            Record::new().with("date", "not a date"),
            Record::new().with("date", 20250701.0),
            Record::new().with("sales", 1.0),
        ];
        let kept = filter_by_date_at(&rows, &DateFilterConfig::year("2025"), day(2025, 1, 1));
        assert!(kept.is_empty());
    }

    #[test]
    fn test_relative_ranges() {
        let today = day(2025, 7, 15);
        let rows = dated(&["2025-07-07", "2025-07-08", "2025-07-15", "2025-07-16", "2025-06-30", "2025-01-01"]);

        let last7 = filter_by_date_at(&rows, &DateFilterConfig::relative(RelativeRange::Last7Days), today);
        assert_eq!(dates_of(&last7), vec!["2025-07-08", "2025-07-15"]);

        let month = filter_by_date_at(&rows, &DateFilterConfig::relative(RelativeRange::ThisMonth), today);
        assert_eq!(month.len(), 4);

        let year = filter_by_date_at(&rows, &DateFilterConfig::relative(RelativeRange::ThisYear), today);
        assert_eq!(year.len(), 6);
    }

    #[test]
    fn test_config_json_shape() {
        let config: DateFilterConfig =
            serde_json::from_value(json!({ "type": "month", "value": "2025-07" })).unwrap();
        assert_eq!(config, DateFilterConfig::month("2025-07"));

        let all: DateFilterConfig = serde_json::from_value(json!({ "type": "all", "value": null })).unwrap();
        assert!(all.is_identity());

        let range = serde_json::to_value(DateFilterConfig::range("2025-01-01", "2025-01-31")).unwrap();
        assert_eq!(range, json!({ "type": "range", "value": { "from": "2025-01-01", "to": "2025-01-31" } }));
    }
}
