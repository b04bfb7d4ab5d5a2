use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState};
use crate::services::results::ResultItem;

/// `PUT /items/{id}`
///
/// Body is a JSON object of base fields and/or custom column names.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<ApiResponse<ResultItem>>, ApiError> {
    let id = validate_id("item", id)?;
    let item = state
        .shared
        .result_service
        .update_item(user.id, id, fields)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}
