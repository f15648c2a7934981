//! REST API payloads.
//!
//! Request bodies carry the data set inline together with a report
//! config in its saved JSON layout, so the server holds no per-client
//! session state.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};
use crate::export::ChartKind;
use crate::models::Dataset;
use crate::pivot::{PivotMatrix, SortKey};
use crate::report::{PivotReport, ReportConfig, ReportPatch};
use crate::session::{dataset_from_json, PivotSession};

/// Body of `POST /api/pivot` and `POST /api/export/csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRequest {
    /// Array of flat records.
    pub data: Value,
    /// Report config (`selectedRows`, `valueFields`, ...).
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub chart: Option<ChartKind>,
}

impl PivotRequest {
    /// Validate the payload and build a session from it.
    pub fn into_session(self) -> ServerResult<PivotSession> {
        let dataset = dataset_from_json(&self.data).map_err(|e| ServerError::BadRequest(e.to_string()))?;
        let config = match &self.config {
            Some(raw) => ReportConfig::from_json(raw).map_err(|e| ServerError::BadRequest(e.to_string()))?,
            None => ReportConfig::default(),
        };

        let mut session = PivotSession::new(dataset);
        session.load_config(config);
        session.set_sort(self.sort);
        Ok(session)
    }
}

/// Response of `POST /api/pivot`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotResponse {
    pub request_id: String,
    /// "ready" or "empty" (no row field or no measure selected)
    pub status: String,
    pub total_count: usize,
    pub filtered_count: usize,
    pub matrix: Option<PivotMatrix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<Value>,
}

impl PivotResponse {
    pub fn from_session(session: &PivotSession, chart: Option<ChartKind>) -> Self {
        let matrix = session.matrix();
        let chart = match (&matrix, chart) {
            (Some(m), Some(kind)) => Some(crate::export::chart_series(m, kind)),
            _ => None,
        };

        Self {
            request_id: Uuid::new_v4().to_string(),
            status: if matrix.is_some() { "ready" } else { "empty" }.to_string(),
            total_count: session.dataset().len(),
            filtered_count: session.filtered_count(),
            matrix,
            chart,
        }
    }
}

/// Response of `POST /api/upload`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub request_id: String,
    pub status: String,
    pub records: Dataset,
    pub metadata: DatasetMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub row_count: usize,
    pub fields: Vec<String>,
    pub numeric_fields: Vec<String>,
}

impl UploadResponse {
    pub fn new(records: Dataset) -> Self {
        let metadata = DatasetMetadata {
            row_count: records.len(),
            fields: records.fields(),
            numeric_fields: records.numeric_fields(),
        };
        Self {
            request_id: Uuid::new_v4().to_string(),
            status: "ready".to_string(),
            records,
            metadata,
        }
    }
}

/// Body of `POST /api/reports`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveReportRequest {
    pub name: String,
    pub config: Value,
}

/// Body of `PUT /api/reports/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReportRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
}

impl UpdateReportRequest {
    pub fn into_patch(self) -> ServerResult<ReportPatch> {
        let config = self
            .config
            .as_ref()
            .map(ReportConfig::from_json)
            .transpose()
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        Ok(ReportPatch {
            name: self.name,
            config,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<PivotReport>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "requestId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
