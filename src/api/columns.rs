use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState};
use crate::services::ColumnError;
use crate::services::columns::{ColumnDto, NewColumn};

impl From<ColumnError> for ApiError {
    fn from(err: ColumnError) -> Self {
        match err {
            ColumnError::Validation(msg) => Self::validation(msg),
            ColumnError::SearchNotFound(id) => Self::not_found("Search", id),
            ColumnError::Conflict(name) => {
                Self::Conflict(format!("Column '{name}' already exists for this search"))
            }
            ColumnError::Database(msg) => Self::DatabaseError(msg),
            ColumnError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateColumnRequest {
    pub search_id: i32,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_generate_data")]
    pub generate_data: bool,
}

const fn default_generate_data() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ColumnsQuery {
    pub search_id: i32,
}

/// `POST /columns`
///
/// Creates a custom column and fills it for every stored result.
pub async fn create_column(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CreateColumnRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ColumnDto>>), ApiError> {
    let column = state
        .shared
        .column_service
        .create(
            user.id,
            NewColumn {
                search_id: validate_id("search", request.search_id)?,
                name: request.name,
                description: request.description,
                generate_data: request.generate_data,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(column))))
}

/// `GET /columns?search_id=`
pub async fn list_columns(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<ColumnsQuery>,
) -> Result<Json<ApiResponse<Vec<ColumnDto>>>, ApiError> {
    let columns = state
        .shared
        .column_service
        .list(user.id, validate_id("search", query.search_id)?)
        .await?;
    Ok(Json(ApiResponse::success(columns)))
}
