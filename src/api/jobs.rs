//! Automation endpoints. A "job" is a saved search re-run on an interval.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{parse_filters, validate_id};
use super::{ApiError, ApiResponse, AppState};
use crate::services::AutomationError;
use crate::services::automation::{AutomationView, NewAutomation, RunReport};

impl From<AutomationError> for ApiError {
    fn from(err: AutomationError) -> Self {
        match err {
            AutomationError::Validation(msg) => Self::validation(msg),
            AutomationError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            AutomationError::Database(msg) => Self::DatabaseError(msg),
            AutomationError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    #[serde(default)]
    pub query: String,
    pub interval: String,
    pub filters: Option<Value>,
    pub search_id: Option<i32>,
}

/// `POST /jobs`
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AutomationView>>), ApiError> {
    let job = state
        .shared
        .automation_service
        .create(
            user.id,
            NewAutomation {
                query: request.query,
                interval: request.interval,
                filters: parse_filters(request.filters)?,
                search_id: request
                    .search_id
                    .map(|id| validate_id("search", id))
                    .transpose()?,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(job))))
}

/// `GET /jobs`
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<AutomationView>>>, ApiError> {
    let jobs = state.shared.automation_service.list(user.id).await?;
    Ok(Json(ApiResponse::success(jobs)))
}

/// `DELETE /jobs/{id}`
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<AutomationView>>, ApiError> {
    let job = state
        .shared
        .automation_service
        .cancel(user.id, validate_id("automation", id)?)
        .await?;
    Ok(Json(ApiResponse::success(job)))
}

/// `POST /jobs/{id}/run`
pub async fn run_job(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<RunReport>>, ApiError> {
    let report = state
        .shared
        .automation_service
        .run_now(user.id, validate_id("automation", id)?)
        .await?;
    Ok(Json(ApiResponse::success(report)))
}
