//! Row filters applied before aggregation.
//!
//! - [`date`] - Narrow rows by a date rule on the `date` field
//! - [`field`] - Narrow rows by categorical allow-lists
//!
//! Both filters are total: malformed filter values match nothing instead
//! of failing, and surviving rows keep their original order.

pub mod date;
pub mod field;

pub use date::{
    filter_by_date, filter_by_date_at, parse_row_date, DateFilterConfig, DateFilterKind,
    DateFilterValue, DateMatcher, RelativeRange,
};
pub use field::{filter_by_fields, FieldFilterConfig, FieldMatcher};

use chrono::NaiveDate;

use crate::models::Record;

/// Apply the date filter, then the field filters.
pub fn apply_filters(
    rows: &[Record],
    date_filter: &DateFilterConfig,
    field_filters: &[FieldFilterConfig],
    today: NaiveDate,
) -> Vec<Record> {
    let date = date_filter.matcher(today);
    let fields = FieldMatcher::new(field_filters);
    rows.iter()
        .filter(|row| date.matches(row) && fields.matches(row))
        .cloned()
        .collect()
}

/// Number of rows surviving both filters.
pub fn filtered_count(
    rows: &[Record],
    date_filter: &DateFilterConfig,
    field_filters: &[FieldFilterConfig],
    today: NaiveDate,
) -> usize {
    let date = date_filter.matcher(today);
    let fields = FieldMatcher::new(field_filters);
    rows.iter()
        .filter(|row| date.matches(row) && fields.matches(row))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Record> {
        vec![
            Record::new().with("region", "N").with("sales", 100.0).with("date", "2025-07-01"),
            Record::new().with("region", "N").with("sales", 200.0).with("date", "2025-06-01"),
            Record::new().with("region", "S").with("sales", 50.0).with("date", "2025-07-02"),
        ]
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
    }

    #[test]
    fn test_composition_equals_sequential_application() {
        let data = rows();
        let date = DateFilterConfig::month("2025-07");
        let fields = vec![FieldFilterConfig::new("region", ["N"])];

        let combined = apply_filters(&data, &date, &fields, today());
        let sequential = filter_by_fields(&filter_by_date_at(&data, &date, today()), &fields);

        assert_eq!(combined, sequential);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].get("sales").as_number(), Some(100.0));
    }

    #[test]
    fn test_survivors_keep_order() {
        let data = rows();
        let kept = apply_filters(&data, &DateFilterConfig::year("2025"), &[], today());
        assert_eq!(kept, data);
        assert_eq!(filtered_count(&data, &DateFilterConfig::month("2025-07"), &[], today()), 2);
    }
}
