//! # Dashboard Module
//!
//! HTTP front end over [`ResearchService`]. It exposes the same flow as the
//! console: submit a topic, get the structured result back together with
//! quick stats and both download formats.
//!
//! Research requests are run one at a time; the service keeps no shared
//! mutable state, so the dashboard queues callers behind an async mutex.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::error::ResearchError;
use crate::export::{self, ExportFormat, ResearchStats};
use crate::schema::ResearchResult;
use crate::service::ResearchService;

#[derive(Clone)]
struct AppState {
    service: Arc<ResearchService>,
    /// Last successful result, for the "latest" and export endpoints
    latest: Arc<RwLock<Option<ResearchResult>>>,
    in_flight: Arc<Mutex<()>>,
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub result: ResearchResult,
    pub stats: ResearchStats,
    /// Save tool confirmation
    pub saved: Option<String>,
    /// Set when the result could not be written to the research log
    pub save_error: Option<String>,
    pub markdown: String,
    pub json: String,
}

/// Build the dashboard router.
pub fn router(service: ResearchService) -> Router {
    let state = AppState {
        service: Arc::new(service),
        latest: Arc::new(RwLock::new(None)),
        in_flight: Arc::new(Mutex::new(())),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/research", post(research))
        .route("/api/research/latest", get(latest))
        .route("/api/research/latest/export/:format", get(export_latest))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve the dashboard until the process stops.
pub async fn serve(service: ResearchService, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Research dashboard listening");
    axum::serve(listener, router(service)).await
}

async fn health() -> &'static str {
    "OK"
}

#[instrument(skip(state))]
async fn research(
    State(state): State<AppState>,
    Json(req): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>, ApiError> {
    let outcome = {
        let _guard = state.in_flight.lock().await;
        state.service.research(&req.topic).await?
    };

    let now = Local::now();
    let result = outcome.result;
    let (saved, save_error) = match outcome.persisted {
        Ok(record) => (Some(record.confirmation), None),
        Err(e) => (None, Some(e.to_string())),
    };

    *state.latest.write().await = Some(result.clone());

    Ok(Json(ResearchResponse {
        stats: ResearchStats::from(&result),
        markdown: export::to_markdown(&result, now),
        json: export::to_json(&result, now),
        saved,
        save_error,
        result,
    }))
}

async fn latest(State(state): State<AppState>) -> Result<Json<ResearchResult>, ApiError> {
    let latest = state.latest.read().await.clone();
    latest.map(Json).ok_or_else(ApiError::no_result)
}

async fn export_latest(
    State(state): State<AppState>,
    Path(format): Path<ExportFormat>,
) -> Result<Response, ApiError> {
    let result = state
        .latest
        .read()
        .await
        .clone()
        .ok_or_else(ApiError::no_result)?;

    let now = Local::now();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::file_name(&result, now, format)
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        format.render(&result, now),
    )
        .into_response())
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================
/// JSON error body `{ "error": ..., "detail": ... }` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    fn no_result() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Run a research to see results".to_string(),
            detail: None,
        }
    }
}

impl From<ResearchError> for ApiError {
    fn from(err: ResearchError) -> Self {
        let (status, detail) = match &err {
            ResearchError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, None),
            ResearchError::Agent(_) => (StatusCode::BAD_GATEWAY, None),
            ResearchError::Extraction(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                e.diagnostic().map(str::to_string),
            ),
        };

        Self {
            status,
            message: err.to_string(),
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message, "detail": self.detail });
        (self.status, Json(body)).into_response()
    }
}
