//! Saved pivot configurations.
//!
//! A [`PivotReport`] is a named snapshot of every live pivot parameter.
//! Stores implement [`ReportStore`] by reading and rewriting the whole
//! report list; the list operations themselves are provided by the trait.

pub mod store;

pub use store::{JsonFileStore, MemoryStore, DEFAULT_REPORTS_PATH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::logs::{log_info, log_success};
use crate::error::{ReportError, ReportResult};
use crate::filter::{DateFilterConfig, FieldFilterConfig};
use crate::pivot::{ConversionRule, ValueField};
use crate::validation;

// =============================================================================
// Types
// =============================================================================

/// Every parameter of a pivot, in the saved JSON layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(rename = "selectedRows", default)]
    pub row_fields: Vec<String>,
    #[serde(rename = "selectedColumns", default)]
    pub column_fields: Vec<String>,
    #[serde(rename = "valueFields", default)]
    pub measures: Vec<ValueField>,
    #[serde(default)]
    pub conversions: Vec<ConversionRule>,
    #[serde(rename = "dateFilter", default)]
    pub date_filter: DateFilterConfig,
    #[serde(rename = "fieldFilters", default)]
    pub field_filters: Vec<FieldFilterConfig>,
}

impl ReportConfig {
    /// Validate raw JSON against the report config schema, then decode it.
    pub fn from_json(value: &Value) -> ReportResult<Self> {
        validation::validate_report_config(value)
            .map_err(|errors| ReportError::InvalidConfig { errors })?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// A saved report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotReport {
    pub id: String,
    pub name: String,
    /// RFC 3339, UTC.
    pub created_at: String,
    pub updated_at: String,
    pub config: ReportConfig,
}

/// Partial update of a report. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Option<ReportConfig>,
}

impl ReportPatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            config: None,
        }
    }
}

// =============================================================================
// Store contract
// =============================================================================

/// Persistence of the report list. Last write wins on the whole list.
pub trait ReportStore {
    /// Current list. Unreadable storage reads as empty.
    fn read_all(&self) -> Vec<PivotReport>;

    /// Replace the stored list.
    fn write_all(&mut self, reports: &[PivotReport]) -> ReportResult<()>;

    fn list(&self) -> Vec<PivotReport> {
        self.read_all()
    }

    fn get(&self, id: &str) -> Option<PivotReport> {
        self.read_all().into_iter().find(|r| r.id == id)
    }

    /// Store `config` under a fresh id.
    fn save(&mut self, name: &str, config: ReportConfig) -> ReportResult<PivotReport> {
        let name = checked_name(name)?;
        let now = timestamp();
        let report = PivotReport {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            created_at: now.clone(),
            updated_at: now,
            config,
        };

        let mut reports = self.read_all();
        reports.push(report.clone());
        self.write_all(&reports)?;
        log_success(format!("Saved report '{}' ({})", report.name, report.id));
        Ok(report)
    }

    /// Apply `patch` and bump `updatedAt`. `Ok(None)` when `id` is unknown.
    fn update(&mut self, id: &str, patch: ReportPatch) -> ReportResult<Option<PivotReport>> {
        let name = patch.name.as_deref().map(checked_name).transpose()?;
        let mut reports = self.read_all();
        let Some(report) = reports.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        if let Some(name) = name {
            report.name = name;
        }
        if let Some(config) = patch.config {
            report.config = config;
        }
        report.updated_at = timestamp();
        let updated = report.clone();

        self.write_all(&reports)?;
        log_info(format!("Updated report '{}'", updated.name));
        Ok(Some(updated))
    }

    fn rename(&mut self, id: &str, name: &str) -> ReportResult<Option<PivotReport>> {
        self.update(id, ReportPatch::rename(name))
    }

    /// `Ok(false)` when `id` is unknown.
    fn delete(&mut self, id: &str) -> ReportResult<bool> {
        let mut reports = self.read_all();
        let before = reports.len();
        reports.retain(|r| r.id != id);
        if reports.len() == before {
            return Ok(false);
        }
        self.write_all(&reports)?;
        log_info(format!("Deleted report {}", id));
        Ok(true)
    }
}

fn checked_name(name: &str) -> ReportResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ReportError::EmptyName);
    }
    Ok(name.to_string())
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::RelativeRange;
    use crate::pivot::{AggregationFunction, Dimension, TargetUnit};
    use serde_json::json;

    pub(crate) fn sample_config() -> ReportConfig {
        ReportConfig {
            row_fields: vec!["region".into(), "product".into()],
            column_fields: vec!["category".into()],
            measures: vec![
                ValueField::new("sales", AggregationFunction::Sum).with_label("Sales"),
                ValueField::new("area", AggregationFunction::Avg),
            ],
            conversions: vec![ConversionRule::new("area", Dimension::Area, TargetUnit::Ft2)],
            date_filter: DateFilterConfig::relative(RelativeRange::ThisYear),
            field_filters: vec![FieldFilterConfig::new("region", ["North", "South"])],
        }
    }

    #[test]
    fn test_config_json_layout() {
        let value = serde_json::to_value(sample_config()).unwrap();
        assert_eq!(value["selectedRows"], json!(["region", "product"]));
        assert_eq!(value["selectedColumns"], json!(["category"]));
        assert_eq!(value["valueFields"][0], json!({ "field": "sales", "aggregation": "sum", "label": "Sales" }));
        assert_eq!(value["conversions"][0], json!({ "field": "area", "type": "area", "targetUnit": "ft2" }));
        assert_eq!(value["dateFilter"], json!({ "type": "relative", "value": "thisYear" }));
        assert_eq!(value["fieldFilters"][0], json!({ "field": "region", "values": ["North", "South"] }));

        let back: ReportConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, sample_config());
    }

    #[test]
    fn test_config_from_json_rejects_bad_shape() {
        let err = ReportConfig::from_json(&json!({ "selectedRows": "region" })).unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig { .. }));

        let ok = ReportConfig::from_json(&json!({
            "selectedRows": ["region"],
            "valueFields": [{ "field": "sales", "aggregation": "max" }]
        }))
        .unwrap();
        assert_eq!(ok.measures[0].aggregation, AggregationFunction::Max);
        assert!(ok.date_filter.is_identity());
    }

    #[test]
    fn test_config_from_json_accepts_source_field() {
        let config = ReportConfig::from_json(&json!({
            "valueFields": [{ "sourceField": "price", "aggregation": "avg" }]
        }))
        .unwrap();
        assert_eq!(config.measures, vec![ValueField::new("price", AggregationFunction::Avg)]);

        let err = ReportConfig::from_json(&json!({ "valueFields": [{ "aggregation": "avg" }] })).unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig { .. }));
    }

    #[test]
    fn test_store_lifecycle() {
        let mut store = MemoryStore::new();
        let saved = store.save("  Q1 review ", sample_config()).unwrap();
        assert_eq!(saved.name, "Q1 review");
        assert_eq!(saved.created_at, saved.updated_at);
        assert!(uuid::Uuid::parse_str(&saved.id).is_ok());

        let renamed = store.rename(&saved.id, "Q1 final").unwrap().unwrap();
        assert_eq!(renamed.name, "Q1 final");
        assert_eq!(renamed.id, saved.id);
        assert_eq!(renamed.created_at, saved.created_at);
        assert_eq!(renamed.config, saved.config);

        assert_eq!(store.list().len(), 1);
        assert!(store.delete(&saved.id).unwrap());
        assert!(!store.delete(&saved.id).unwrap());
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_unknown_ids_and_empty_names() {
        let mut store = MemoryStore::new();
        assert!(store.rename("missing", "x").unwrap().is_none());
        assert!(store.get("missing").is_none());
        assert!(matches!(store.save("   ", ReportConfig::default()), Err(ReportError::EmptyName)));

        let saved = store.save("a", ReportConfig::default()).unwrap();
        assert!(matches!(store.rename(&saved.id, ""), Err(ReportError::EmptyName)));
        assert_eq!(store.get(&saved.id).unwrap().name, "a");
    }

    #[test]
    fn test_update_config_only() {
        let mut store = MemoryStore::new();
        let saved = store.save("a", ReportConfig::default()).unwrap();
        let patch = ReportPatch {
            name: None,
            config: Some(sample_config()),
        };
        let updated = store.update(&saved.id, patch).unwrap().unwrap();
        assert_eq!(updated.name, "a");
        assert_eq!(updated.config, sample_config());
    }
}
