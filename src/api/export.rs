use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{ApiError, AppState};
use crate::services::{ExportError, ExportFormat};

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Validation(msg) => Self::validation(msg),
            ExportError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            ExportError::Render(msg) | ExportError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default = "default_format")]
    pub format: String,
    pub search_id: Option<i32>,
    #[serde(default = "default_include_columns")]
    pub include_columns: bool,
}

fn default_format() -> String {
    "excel".to_string()
}

const fn default_include_columns() -> bool {
    true
}

/// `GET /export?format=excel|pdf&search_id=&include_columns=`
///
/// Returns the file itself, not a JSON envelope.
pub async fn export(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = query.format.parse()?;
    let search_id = query
        .search_id
        .map(|id| validate_id("search", id))
        .transpose()?;

    let file = state
        .shared
        .export_service
        .export(user.id, search_id, format, query.include_columns)
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    )
        .into_response())
}
