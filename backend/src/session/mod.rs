//! Interactive pivot session.
//!
//! A [`PivotSession`] owns one data set and the live pivot parameters.
//! Every setter replaces one parameter wholesale; [`PivotSession::matrix`]
//! recomputes filter -> pivot -> sort from scratch on each call.
//!
//! ```rust,ignore
//! use pivotdesk::{PivotSession, load_dataset};
//!
//! let mut session = PivotSession::new(load_dataset("sales.csv")?);
//! session.set_row_fields(vec!["region".into()]);
//! session.add_measure("sales");
//! let matrix = session.matrix().unwrap();
//! ```

pub mod loader;

pub use loader::{dataset_from_json, load_csv_bytes, load_dataset};

use chrono::{Local, NaiveDate};

use crate::api::logs::{log_info, log_info_indent};
use crate::error::{SessionError, SessionResult};
use crate::export::matrix_to_csv;
use crate::filter::{apply_filters, filtered_count, DateFilterConfig, FieldFilterConfig};
use crate::models::{Dataset, Record};
use crate::pivot::{
    build_matrix, AggregationFunction, ConversionRule, ConversionSet, PivotMatrix, SortKey,
    SortState, ValueField,
};
use crate::report::{PivotReport, ReportConfig, ReportPatch, ReportStore};

#[derive(Debug, Clone, Default)]
pub struct PivotSession {
    dataset: Dataset,
    row_fields: Vec<String>,
    column_fields: Vec<String>,
    measures: Vec<ValueField>,
    conversions: ConversionSet,
    date_filter: DateFilterConfig,
    field_filters: Vec<FieldFilterConfig>,
    sort: SortState,
    /// Fixed "today" for relative date filters; `None` reads the local clock.
    today: Option<NaiveDate>,
}

impl PivotSession {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            ..Self::default()
        }
    }

    /// Pin the date used by relative date filters.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    // =========================================================================
    // Data set
    // =========================================================================

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
    }

    /// Union of field names across all records, `date` excluded.
    pub fn available_fields(&self) -> Vec<String> {
        self.dataset.fields()
    }

    pub fn numeric_fields(&self) -> Vec<String> {
        self.dataset.numeric_fields()
    }

    /// Distinct values of `field`, for building field filters.
    pub fn unique_values(&self, field: &str) -> Vec<String> {
        self.dataset.unique_values(field)
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    pub fn row_fields(&self) -> &[String] {
        &self.row_fields
    }

    pub fn column_fields(&self) -> &[String] {
        &self.column_fields
    }

    pub fn measures(&self) -> &[ValueField] {
        &self.measures
    }

    pub fn conversions(&self) -> &[ConversionRule] {
        self.conversions.rules()
    }

    pub fn date_filter(&self) -> &DateFilterConfig {
        &self.date_filter
    }

    pub fn field_filters(&self) -> &[FieldFilterConfig] {
        &self.field_filters
    }

    pub fn set_row_fields(&mut self, fields: Vec<String>) {
        self.row_fields = fields;
    }

    pub fn set_column_fields(&mut self, fields: Vec<String>) {
        self.column_fields = fields;
    }

    pub fn set_measures(&mut self, measures: Vec<ValueField>) {
        self.measures = measures;
    }

    pub fn set_conversions(&mut self, rules: Vec<ConversionRule>) {
        self.conversions = ConversionSet::new(&rules);
    }

    /// Activate `rule`, replacing any rule on the same field.
    pub fn set_conversion(&mut self, rule: ConversionRule) {
        self.conversions.insert(rule);
    }

    pub fn remove_conversion(&mut self, field: &str) {
        self.conversions.remove_field(field);
    }

    pub fn set_date_filter(&mut self, filter: DateFilterConfig) {
        self.date_filter = filter;
    }

    pub fn set_field_filters(&mut self, filters: Vec<FieldFilterConfig>) {
        self.field_filters = filters;
    }

    /// Flip `value` in the allow-list of `field`, creating the entry if needed.
    pub fn toggle_filter_value(&mut self, field: &str, value: &str) {
        match self.field_filters.iter_mut().find(|f| f.field == field) {
            Some(filter) => filter.toggle(value),
            None => self
                .field_filters
                .push(FieldFilterConfig::new(field, [value])),
        }
    }

    /// Add a `sum` measure on `field` labelled with the field name.
    /// Returns `false` if the field already has a measure.
    pub fn add_measure(&mut self, field: &str) -> bool {
        if self.measures.iter().any(|m| m.field == field) {
            return false;
        }
        self.measures
            .push(ValueField::new(field, AggregationFunction::Sum).with_label(field));
        true
    }

    /// Drop every measure and conversion rule on `field`.
    pub fn remove_measure(&mut self, field: &str) {
        self.measures.retain(|m| m.field != field);
        self.conversions.remove_field(field);
    }

    /// Change the aggregation of the measure at `index`.
    pub fn set_measure_aggregation(&mut self, index: usize, aggregation: AggregationFunction) -> bool {
        match self.measures.get_mut(index) {
            Some(measure) => {
                measure.aggregation = aggregation;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    pub fn toggle_sort(&mut self, field: &str) {
        self.sort.toggle(field);
    }

    pub fn set_sort(&mut self, key: Option<SortKey>) {
        self.sort.set(key);
    }

    pub fn sort(&self) -> Option<&SortKey> {
        self.sort.active()
    }

    // =========================================================================
    // Derived views
    // =========================================================================

    pub fn filtered_rows(&self) -> Vec<Record> {
        apply_filters(
            self.dataset.records(),
            &self.date_filter,
            &self.field_filters,
            self.today(),
        )
    }

    pub fn filtered_count(&self) -> usize {
        filtered_count(
            self.dataset.records(),
            &self.date_filter,
            &self.field_filters,
            self.today(),
        )
    }

    /// Current matrix, or `None` until at least one row field and one
    /// measure are selected.
    pub fn matrix(&self) -> Option<PivotMatrix> {
        if self.row_fields.is_empty() || self.measures.is_empty() {
            return None;
        }

        let rows = self.filtered_rows();
        log_info(format!(
            "Pivoting {} of {} records",
            rows.len(),
            self.dataset.len()
        ));

        let mut matrix = build_matrix(
            &rows,
            &self.row_fields,
            &self.column_fields,
            &self.measures,
            self.conversions.rules(),
        );
        self.sort.apply(&mut matrix);

        log_info_indent(
            format!(
                "{} row groups x {} columns x {} measures",
                matrix.rows.len(),
                matrix.column_headers.len(),
                matrix.measure_keys.len()
            ),
            1,
        );
        Some(matrix)
    }

    /// CSV export of the current matrix; empty when there is none.
    pub fn export_csv(&self) -> String {
        self.matrix().map(|m| matrix_to_csv(&m)).unwrap_or_default()
    }

    // =========================================================================
    // Report configs
    // =========================================================================

    pub fn config(&self) -> ReportConfig {
        ReportConfig {
            row_fields: self.row_fields.clone(),
            column_fields: self.column_fields.clone(),
            measures: self.measures.clone(),
            conversions: self.conversions.rules().to_vec(),
            date_filter: self.date_filter.clone(),
            field_filters: self.field_filters.clone(),
        }
    }

    /// Replace every parameter with `config` and clear the sort.
    pub fn load_config(&mut self, config: ReportConfig) {
        self.row_fields = config.row_fields;
        self.column_fields = config.column_fields;
        self.measures = config.measures;
        self.conversions = ConversionSet::new(&config.conversions);
        self.date_filter = config.date_filter;
        self.field_filters = config.field_filters;
        self.sort.clear();
    }

    pub fn save_report<S: ReportStore + ?Sized>(&self, store: &mut S, name: &str) -> SessionResult<PivotReport> {
        Ok(store.save(name, self.config())?)
    }

    /// Overwrite the stored config of report `id` with the current parameters.
    pub fn update_report<S: ReportStore + ?Sized>(&self, store: &mut S, id: &str) -> SessionResult<PivotReport> {
        let patch = ReportPatch {
            name: None,
            config: Some(self.config()),
        };
        store
            .update(id, patch)?
            .ok_or_else(|| SessionError::ReportNotFound(id.to_string()))
    }

    pub fn load_report<S: ReportStore + ?Sized>(&mut self, store: &S, id: &str) -> SessionResult<PivotReport> {
        let report = store
            .get(id)
            .ok_or_else(|| SessionError::ReportNotFound(id.to_string()))?;
        self.load_config(report.config.clone());
        log_info(format!("Loaded report '{}'", report.name));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RelativeRange;
    use crate::pivot::{Dimension, SortDirection, TargetUnit, TOTAL_COLUMN};
    use crate::report::MemoryStore;
    use serde_json::json;

    fn session() -> PivotSession {
        let data = Dataset::from_json(&json!([
            { "date": "2025-07-01", "region": "North", "product": "A", "sales": 100, "area": 10 },
            { "date": "2025-06-15", "region": "North", "product": "B", "sales": 200, "area": 20 },
            { "date": "2025-07-03", "region": "South", "product": "A", "sales": 50, "area": 5 },
            { "date": "2024-12-31", "region": "East", "product": "B", "sales": 70, "area": 7 }
        ]))
        .unwrap();
        PivotSession::new(data).with_today(NaiveDate::from_ymd_opt(2025, 7, 4).unwrap())
    }

    #[test]
    fn test_matrix_requires_rows_and_measures() {
        let mut s = session();
        assert!(s.matrix().is_none());
        s.set_row_fields(vec!["region".into()]);
        assert!(s.matrix().is_none());
        s.add_measure("sales");
        assert!(s.matrix().is_some());
        assert_eq!(s.export_csv().lines().count(), 5);
    }

    #[test]
    fn test_add_measure_defaults() {
        let mut s = session();
        assert!(s.add_measure("sales"));
        assert!(!s.add_measure("sales"));
        assert_eq!(s.measures()[0].aggregation, AggregationFunction::Sum);
        assert_eq!(s.measures()[0].label.as_deref(), Some("sales"));
        assert!(s.set_measure_aggregation(0, AggregationFunction::Avg));
        assert!(!s.set_measure_aggregation(5, AggregationFunction::Avg));
    }

    #[test]
    fn test_remove_measure_drops_conversion() {
        let mut s = session();
        s.add_measure("area");
        s.set_conversion(ConversionRule::new("area", Dimension::Area, TargetUnit::Ft2));
        s.remove_measure("area");
        assert!(s.measures().is_empty());
        assert!(s.conversions().is_empty());
    }

    #[test]
    fn test_relative_filter_uses_pinned_today() {
        let mut s = session();
        s.set_date_filter(DateFilterConfig::relative(RelativeRange::ThisYear));
        assert_eq!(s.filtered_count(), 3);
        s.set_date_filter(DateFilterConfig::relative(RelativeRange::Last7Days));
        assert_eq!(s.filtered_count(), 2);
    }

    #[test]
    fn test_toggle_filter_value() {
        let mut s = session();
        s.toggle_filter_value("region", "North");
        assert_eq!(s.filtered_count(), 2);
        s.toggle_filter_value("region", "North");
        // entry stays but is empty, so it no longer constrains
        assert_eq!(s.field_filters().len(), 1);
        assert_eq!(s.filtered_count(), 4);
    }

    #[test]
    fn test_sort_applies_to_matrix() {
        let mut s = session();
        s.set_row_fields(vec!["region".into()]);
        s.add_measure("sales");
        s.toggle_sort("region");
        s.toggle_sort("region");
        assert_eq!(s.sort().map(|k| k.direction), Some(SortDirection::Desc));

        let m = s.matrix().unwrap();
        let order: Vec<String> = m.rows.iter().map(|r| r.group_key[0].as_key_string()).collect();
        assert_eq!(order, vec!["South", "North", "East"]);
    }

    #[test]
    fn test_load_config_replaces_everything() {
        let mut s = session();
        s.set_row_fields(vec!["region".into()]);
        s.set_column_fields(vec!["product".into()]);
        s.add_measure("sales");
        s.set_date_filter(DateFilterConfig::year("2025"));
        s.toggle_sort("region");

        let config = ReportConfig {
            row_fields: vec!["product".into()],
            measures: vec![ValueField::new("area", AggregationFunction::Max)],
            ..ReportConfig::default()
        };
        s.load_config(config.clone());

        assert_eq!(s.config(), config);
        assert!(s.sort().is_none());
        assert!(s.column_fields().is_empty());
        assert!(s.date_filter().is_identity());

        let m = s.matrix().unwrap();
        assert_eq!(m.column_headers[0].label, TOTAL_COLUMN);
        assert_eq!(m.grand_total("area_max"), Some(30.0));
    }

    #[test]
    fn test_report_round_trip_through_store() {
        let mut store = MemoryStore::new();
        let mut s = session();
        s.set_row_fields(vec!["region".into()]);
        s.add_measure("sales");
        s.set_conversion(ConversionRule::new("sales", Dimension::Amount, TargetUnit::Crores));
        let saved = s.save_report(&mut store, "Regional").unwrap();

        let mut fresh = session();
        fresh.load_report(&store, &saved.id).unwrap();
        assert_eq!(fresh.config(), s.config());

        fresh.set_column_fields(vec!["product".into()]);
        let updated = fresh.update_report(&mut store, &saved.id).unwrap();
        assert_eq!(updated.config.column_fields, vec!["product"]);

        assert!(matches!(
            fresh.load_report(&store, "nope"),
            Err(SessionError::ReportNotFound(_))
        ));
    }
}
