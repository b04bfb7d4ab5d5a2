//! Search, AI search, refinement and search history endpoints.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::auth::{CurrentUser, MaybeUser};
use super::validation::{
    DEFAULT_PAGE_SIZE, merge_status, parse_filters, validate_id, validate_page,
    validate_page_size,
};
use super::{ApiError, ApiResponse, AppState};
use crate::models::result::ResultFilters;
use crate::services::ResultError;
use crate::services::results::{
    AiSearchOutcome, HistoryPage, RefineOutcome, SearchPage, SearchParams,
};

impl From<ResultError> for ApiError {
    fn from(err: ResultError) -> Self {
        match err {
            ResultError::Validation(msg) => Self::validation(msg),
            ResultError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            ResultError::Unauthorized => Self::unauthorized(),
            ResultError::Database(msg) => Self::DatabaseError(msg),
            ResultError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AiSearchRequest {
    pub query: String,
    #[serde(default)]
    pub create_filters: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub country: Option<String>,
    pub language: Option<String>,
    pub category: Option<String>,
    pub state: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub search_id: Option<i32>,
}

const fn default_page() -> u64 {
    1
}

const fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
pub struct RefineRequest {
    pub filters: Option<Value>,
    #[serde(alias = "result_set_ref")]
    pub search_id: Option<i32>,
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_history_page_size")]
    pub page_size: u64,
}

const fn default_history_page_size() -> u64 {
    20
}

/// `POST /ai-search`
///
/// Interprets the query, searches with the interpreted filters as provider
/// hints and stores the result set for authenticated callers.
pub async fn ai_search(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Json(request): Json<AiSearchRequest>,
) -> Result<Json<ApiResponse<AiSearchOutcome>>, ApiError> {
    let outcome = state
        .shared
        .result_service
        .ai_search(user.id(), &request.query, request.create_filters)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// `GET /search`
///
/// Without `search_id` runs a fresh search; with it pages through the stored
/// results of that search, so edits are visible.
pub async fn search(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchPage>>, ApiError> {
    let params = SearchParams {
        page: validate_page(query.page)?,
        page_size: validate_page_size(query.page_size)?,
        search_id: query.search_id.map(|id| validate_id("search", id)).transpose()?,
        filters: ResultFilters {
            country: query.country,
            language: query.language,
            category: query.category,
            status: merge_status(query.state, query.status)?,
            source: query.source,
        }
        .normalized(),
        query: query.q,
    };

    let page = state
        .shared
        .result_service
        .search_page(user.id(), params)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// `POST /refine`
pub async fn refine(
    State(state): State<Arc<AppState>>,
    user: MaybeUser,
    Json(request): Json<RefineRequest>,
) -> Result<Json<ApiResponse<RefineOutcome>>, ApiError> {
    let filters = parse_filters(request.filters)?;
    let search_id = request
        .search_id
        .map(|id| validate_id("search", id))
        .transpose()?;

    let outcome = state
        .shared
        .result_service
        .refine(user.id(), filters, search_id, request.query.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// `GET /profile/history`
pub async fn history(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<HistoryPage>>, ApiError> {
    let page = state
        .shared
        .result_service
        .history(
            user.id,
            validate_page(query.page)?,
            validate_page_size(query.page_size)?,
        )
        .await?;
    Ok(Json(ApiResponse::success(page)))
}
