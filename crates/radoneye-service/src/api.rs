//! HTTP endpoints for the radoneye-service.
//!
//! - `GET /metrics` - current value per device in Prometheus text format
//! - `GET /api/health` - liveness check
//! - `GET /api/devices` - registered devices with their window summaries
//! - `GET /api/devices/{id}` - one device, looked up by address or name
//! - `GET /api/status` - collector state and per-device statistics
//!
//! Handlers never wait on the collector: window reads take a per-device
//! read lock that the scheduler holds only for a single push.
//!
//! # Example
//!
//! ```ignore
//! use radoneye_service::api;
//!
//! let app = api::router().with_state(state);
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use radoneye_core::{DeviceRegistration, DeviceStats, WindowSummary};
use radoneye_types::{DeviceType, Unit};

use crate::snapshot::{PROMETHEUS_CONTENT_TYPE, Snapshot, now_millis};
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/api/health", get(health))
        .route("/api/status", get(get_status))
        .route("/api/devices", get(list_devices))
        .route("/api/devices/{id}", get(get_device))
}

/// Prometheus scrape endpoint.
///
/// A failed mirror write is logged and does not affect the response.
async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let snapshot = Snapshot::capture(&state.registry, &state.windows, now_millis())?;
    debug!("Serving {} metric line(s)", snapshot.entries.len());

    if let Err(e) = state.sink.write(&snapshot).await {
        warn!("Failed to write snapshot mirror: {}", e);
    }

    Ok((
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        snapshot.render_prometheus(),
    ))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// A registered device with its window summary.
#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub address: String,
    pub name: String,
    pub device_type: DeviceType,
    #[serde(flatten)]
    pub window: WindowSummary,
}

/// Response for `GET /api/devices`.
#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub unit: Unit,
    pub symbol: &'static str,
    pub devices: Vec<DeviceResponse>,
}

fn device_response(state: &AppState, device: &DeviceRegistration) -> Result<DeviceResponse, AppError> {
    Ok(DeviceResponse {
        address: device.address.clone(),
        name: device.name.clone(),
        device_type: device.device_type,
        window: state.windows.summary(&device.address)?,
    })
}

async fn list_devices(State(state): State<Arc<AppState>>) -> Result<Json<DevicesResponse>, AppError> {
    let devices = state
        .registry
        .iter()
        .map(|device| device_response(&state, device))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(DevicesResponse {
        unit: state.unit,
        symbol: state.unit.symbol(),
        devices,
    }))
}

async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeviceResponse>, AppError> {
    let device = state
        .registry
        .get(&id)
        .or_else(|| state.registry.iter().find(|d| d.name == id))
        .ok_or_else(|| AppError::NotFound(format!("Device '{}' is not registered", id)))?;

    Ok(Json(device_response(&state, device)?))
}

/// Collector status.
#[derive(Debug, Serialize)]
pub struct CollectorStatus {
    pub running: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    pub uptime_seconds: Option<i64>,
}

/// Response for `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub unit: Unit,
    pub collector: CollectorStatus,
    pub devices: Vec<DeviceStats>,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let running = state.collector.is_running();
    let started_at = state.collector.started_at();
    let uptime_seconds = started_at
        .filter(|_| running)
        .map(|s| (OffsetDateTime::now_utc() - s).whole_seconds().max(0));

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        unit: state.unit,
        collector: CollectorStatus {
            running,
            started_at,
            uptime_seconds,
        },
        devices: state.stats.snapshot(),
    })
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Core(radoneye_core::Error),
}

impl From<radoneye_core::Error> for AppError {
    fn from(e: radoneye_core::Error) -> Self {
        AppError::Core(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Core(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
