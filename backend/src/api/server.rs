//! HTTP server for the pivot API.
//!
//! # API Endpoints
//!
//! | Method | Path                  | Description                          |
//! |--------|-----------------------|--------------------------------------|
//! | GET    | `/health`             | Health check                         |
//! | POST   | `/api/upload`         | Parse an uploaded CSV into records   |
//! | POST   | `/api/pivot`          | Data + config -> matrix              |
//! | POST   | `/api/export/csv`     | Data + config -> CSV download        |
//! | GET    | `/api/reports`        | List saved reports                   |
//! | POST   | `/api/reports`        | Save a report                        |
//! | GET    | `/api/reports/{id}`   | Fetch one report                     |
//! | PUT    | `/api/reports/{id}`   | Rename and/or replace its config     |
//! | DELETE | `/api/reports/{id}`   | Delete a report                      |
//! | GET    | `/api/logs`           | SSE stream for real-time logs        |

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{
    error_response, PivotRequest, PivotResponse, ReportListResponse, SaveReportRequest,
    UpdateReportRequest, UploadResponse,
};
use crate::config::Settings;
use crate::error::{ServerError, SessionError};
use crate::export::matrix_to_csv;
use crate::pivot::PivotMatrix;
use crate::report::{JsonFileStore, PivotReport, ReportConfig, ReportStore};
use crate::session::load_csv_bytes;

type Rejection = (StatusCode, Json<Value>);

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Box<dyn ReportStore + Send>>>,
    pub export_name: String,
}

impl AppState {
    pub fn new<S: ReportStore + Send + 'static>(store: S, export_name: impl Into<String>) -> Self {
        Self {
            store: Arc::new(Mutex::new(Box::new(store))),
            export_name: export_name.into(),
        }
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Session(SessionError::ReportNotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Session(SessionError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            ServerError::Session(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn rejection(self) -> Rejection {
        let status = self.status();
        if status.is_server_error() {
            log_error(self.to_string());
        }
        (status, Json(error_response(&self.to_string())))
    }
}

/// Build the router over `state`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/pivot", post(pivot))
        .route("/api/export/csv", post(export_csv))
        .route("/api/reports", get(list_reports).post(save_report))
        .route(
            "/api/reports/{id}",
            get(get_report).put(update_report).delete(delete_report),
        )
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server with a file-backed report store.
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileStore::with_path(&settings.reports_path);
    let state = AppState::new(store, settings.export_name.clone());
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    println!("🚀 Pivotdesk server running on http://localhost:{}", settings.port);
    println!("   POST /api/pivot        - Build a pivot matrix");
    println!("   POST /api/export/csv   - Export a pivot as CSV");
    println!("   POST /api/upload       - Upload CSV file");
    println!("   *    /api/reports      - Saved reports ({})", settings.reports_path.display());
    println!("   GET  /api/logs         - SSE log stream");
    println!("   GET  /health           - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "pivotdesk",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "pivot": "POST /api/pivot",
            "export": "POST /api/export/csv",
            "upload": "POST /api/upload",
            "reports": "GET|POST /api/reports, GET|PUT|DELETE /api/reports/{id}",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        // lagged receivers skip ahead
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

async fn upload_csv(mut multipart: Multipart) -> Result<Json<UploadResponse>, Rejection> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)).rejection())?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)).rejection())?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()).rejection())?;
    log_info(format!(
        "Upload {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let records = load_csv_bytes(&bytes)
        .map_err(|e| ServerError::BadRequest(e.to_string()).rejection())?;
    Ok(Json(UploadResponse::new(records)))
}

async fn pivot(Json(request): Json<PivotRequest>) -> Result<Json<PivotResponse>, Rejection> {
    let chart = request.chart;
    let session = request.into_session().map_err(ServerError::rejection)?;
    Ok(Json(PivotResponse::from_session(&session, chart)))
}

async fn export_csv(
    State(state): State<AppState>,
    Json(request): Json<PivotRequest>,
) -> Result<Response, Rejection> {
    let session = request.into_session().map_err(ServerError::rejection)?;
    let csv = session
        .matrix()
        .map(|m: PivotMatrix| matrix_to_csv(&m))
        .unwrap_or_default();

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", state.export_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// Run `op` against the report store on the blocking pool.
///
/// Store backends do synchronous file IO, so neither the lock wait nor the
/// IO happens on a runtime worker.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, Rejection>
where
    F: FnOnce(&mut (dyn ReportStore + Send)) -> T + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || {
        let mut guard = store.blocking_lock();
        op(&mut **guard)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("report store task failed: {}", e)).rejection())
}

async fn list_reports(State(state): State<AppState>) -> Result<Json<ReportListResponse>, Rejection> {
    let reports = with_store(&state, |store| store.list()).await?;
    Ok(Json(ReportListResponse { reports }))
}

async fn save_report(
    State(state): State<AppState>,
    Json(request): Json<SaveReportRequest>,
) -> Result<(StatusCode, Json<PivotReport>), Rejection> {
    let config = ReportConfig::from_json(&request.config)
        .map_err(|e| ServerError::BadRequest(e.to_string()).rejection())?;
    let name = request.name;
    let report = with_store(&state, move |store| store.save(&name, config))
        .await?
        .map_err(|e| report_rejection(e.into()))?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PivotReport>, Rejection> {
    let lookup = id.clone();
    with_store(&state, move |store| store.get(&lookup))
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("report {}", id)).rejection())
}

async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateReportRequest>,
) -> Result<Json<PivotReport>, Rejection> {
    let patch = request.into_patch().map_err(ServerError::rejection)?;
    let target = id.clone();
    with_store(&state, move |store| store.update(&target, patch))
        .await?
        .map_err(|e| report_rejection(e.into()))?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("report {}", id)).rejection())
}

async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, Rejection> {
    let target = id.clone();
    match with_store(&state, move |store| store.delete(&target)).await? {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(ServerError::NotFound(format!("report {}", id)).rejection()),
        Err(e) => Err(report_rejection(e.into())),
    }
}

/// Empty names are the client's fault; everything else is ours.
fn report_rejection(err: SessionError) -> Rejection {
    match err {
        SessionError::Report(crate::error::ReportError::EmptyName) => {
            ServerError::BadRequest(err.to_string()).rejection()
        }
        other => ServerError::Session(other).rejection(),
    }
}
