//! Liveness, readiness and metrics endpoints.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiResponse, AppState};
use crate::models::now_timestamp;

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub environment: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthReadinessChecks {
    pub database: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub checks: HealthReadinessChecks,
}

/// `GET /healthz`
///
/// Answers without touching the database.
pub async fn health_live(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let environment = state.config().read().await.general.environment.clone();

    Json(ApiResponse::success(HealthLiveResponse {
        status: "ok",
        service: "radar",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now_timestamp(),
        environment,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    }))
}

/// `GET /readyz`
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Response {
    let database = match state.store().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            false
        }
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::success(HealthReadyResponse {
            ready: database,
            checks: HealthReadinessChecks { database },
        })),
    )
        .into_response()
}
