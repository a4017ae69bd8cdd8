//! HTTP API Server for Zonewatch
//!
//! Read-only JSON snapshots of the live pipeline for dashboards.

use crate::{
    core::{Anomaly, Reading, ZoneRange},
    sources::{
        stream_ingestion_pipeline::IngestionPipeline,
        stream_source::{ConnectionState, SourceMetricsSnapshot},
    },
    stream::{
        baseline::{Baseline, BaselineState},
        comparator::{WindowStats, ZoneComparison},
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Response for pipeline status
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub connection: ConnectionState,
    pub metrics: SourceMetricsSnapshot,
    pub zones_tracked: usize,
    pub anomalies_logged: usize,
    pub baselines_available: bool,
}

#[derive(Debug, Serialize)]
pub struct ZoneSummary {
    pub zone_id: String,
    pub zone_name: Option<String>,
    pub range: Option<ZoneRange>,
    pub latest: Option<Reading>,
}

/// Response for listing zones
#[derive(Debug, Serialize)]
pub struct ListZonesResponse {
    pub zones: Vec<ZoneSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub zone_id: String,
    pub readings: Vec<Reading>,
    pub stats: Option<WindowStats>,
}

#[derive(Debug, Serialize)]
pub struct ComparisonResponse {
    pub zone_id: String,
    pub latest: ZoneComparison,
    pub window: ZoneComparison,
}

#[derive(Debug, Serialize)]
pub struct AnomaliesResponse {
    pub anomalies: Vec<Anomaly>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct BaselinesResponse {
    pub baselines: Vec<Baseline>,
    pub total: usize,
}

/// Shared application state
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
}

/// Custom error type for API errors
pub enum ApiError {
    NotFound(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

/// Create the HTTP server with all routes
pub fn create_server(pipeline: Arc<IngestionPipeline>) -> Router {
    let state = Arc::new(AppState { pipeline });

    // Configure CORS
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/status", get(status))
        .route("/api/zones", get(list_zones))
        .route("/api/zones/:id/latest", get(zone_latest))
        .route("/api/zones/:id/window", get(zone_window))
        .route("/api/zones/:id/comparison", get(zone_comparison))
        .route("/api/anomalies", get(list_anomalies))
        .route("/api/baselines", get(list_baselines))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A zone is known if it has a registered range or has been seen on the stream.
fn ensure_known_zone(state: &AppState, zone_id: &str) -> Result<(), ApiError> {
    let monitor = state.pipeline.monitor();
    if monitor.registry().get(zone_id).is_some() || monitor.latest(zone_id).is_some() {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("Zone '{}' not found", zone_id)))
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(SuccessResponse { message: "Zonewatch HTTP API is running".to_string() })
}

/// GET /api/status - Connection state and counters
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let pipeline = &state.pipeline;
    let monitor = pipeline.monitor();

    Json(StatusResponse {
        connection: pipeline.connection_state(),
        metrics: pipeline.source_metrics(),
        zones_tracked: monitor.zone_ids().len(),
        anomalies_logged: monitor.anomalies().len(),
        baselines_available: monitor.baselines().is_available(),
    })
}

/// GET /api/zones - Registered and observed zones with their latest reading
async fn list_zones(State(state): State<Arc<AppState>>) -> Json<ListZonesResponse> {
    let monitor = state.pipeline.monitor();
    let registry = monitor.registry();

    let mut zone_ids = registry.list_all();
    zone_ids.extend(monitor.zone_ids());
    zone_ids.sort();
    zone_ids.dedup();

    let zones: Vec<ZoneSummary> = zone_ids
        .into_iter()
        .map(|zone_id| {
            let info = registry.get(&zone_id);
            ZoneSummary {
                zone_name: info.map(|i| i.name.clone()),
                range: info.map(|i| i.range),
                latest: monitor.latest(&zone_id),
                zone_id,
            }
        })
        .collect();

    let total = zones.len();
    Json(ListZonesResponse { zones, total })
}

/// GET /api/zones/:id/latest - Most recent reading of a zone
async fn zone_latest(
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Result<Json<Reading>, ApiError> {
    state
        .pipeline
        .monitor()
        .latest(&zone_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No readings for zone '{}'", zone_id)))
}

/// GET /api/zones/:id/window - History window of a zone, oldest first
async fn zone_window(
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Result<Json<WindowResponse>, ApiError> {
    ensure_known_zone(&state, &zone_id)?;
    let monitor = state.pipeline.monitor();

    Ok(Json(WindowResponse {
        readings: monitor.window(&zone_id),
        stats: monitor.window_stats(&zone_id),
        zone_id,
    }))
}

/// GET /api/zones/:id/comparison - Latest reading and window mean against the baseline
async fn zone_comparison(
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<String>,
) -> Result<Json<ComparisonResponse>, ApiError> {
    ensure_known_zone(&state, &zone_id)?;
    let monitor = state.pipeline.monitor();

    Ok(Json(ComparisonResponse {
        latest: monitor.comparison(&zone_id),
        window: monitor.window_comparison(&zone_id),
        zone_id,
    }))
}

/// GET /api/anomalies - Anomaly log, newest first
async fn list_anomalies(State(state): State<Arc<AppState>>) -> Json<AnomaliesResponse> {
    let anomalies = state.pipeline.monitor().anomalies();
    let total = anomalies.len();
    Json(AnomaliesResponse { anomalies, total })
}

/// GET /api/baselines - Per-zone baselines
async fn list_baselines(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BaselinesResponse>, ApiError> {
    match state.pipeline.monitor().baselines() {
        BaselineState::Ready(baselines) => {
            let mut baselines: Vec<Baseline> = baselines.values().cloned().collect();
            baselines.sort_by(|a, b| a.zone_id.cmp(&b.zone_id));
            let total = baselines.len();
            Ok(Json(BaselinesResponse { baselines, total }))
        }
        BaselineState::Unavailable { reason } => {
            Err(ApiError::Unavailable(format!("Baselines unavailable: {}", reason)))
        }
    }
}

/// Start the HTTP server on the specified address
pub async fn start_server(addr: &str, pipeline: Arc<IngestionPipeline>) -> crate::Result<()> {
    let app = create_server(pipeline);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Zonewatch HTTP API listening");

    axum::serve(listener, app).await?;
    Ok(())
}
