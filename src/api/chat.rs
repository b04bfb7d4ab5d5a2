//! Assistant chats for filters, columns and product support.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_message;
use super::{ApiError, ApiResponse, AppState};
use crate::services::ai::{ColumnSuggestion, FilterSuggestion, HelpfulLink};
use crate::services::results::load_owned_search;

const FILTER_FOLLOW_UPS: [&str; 4] = [
    "Filtrar por país específico",
    "Limitar por rango de fechas",
    "Filtrar por categoría",
    "Ordenar por relevancia",
];

const COLUMN_FOLLOW_UPS: [&str; 4] = [
    "Añadir columna de análisis de sentimiento",
    "Crear columna de categorización automática",
    "Generar columna de puntuación de relevancia",
    "Añadir columna de resumen ejecutivo",
];

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub search_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct FilterProposal {
    pub suggested_filters: Vec<FilterSuggestion>,
    pub explanation: String,
}

#[derive(Debug, Serialize)]
pub struct FilterChatResponse {
    pub response: String,
    pub filters: FilterProposal,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ColumnChatResponse {
    pub response: String,
    pub columns: Vec<ColumnSuggestion>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SupportChatResponse {
    pub response: String,
    pub suggested_actions: Vec<String>,
    pub helpful_links: Vec<HelpfulLink>,
}

fn or_default(message: String, default: &str) -> String {
    if message.trim().is_empty() {
        default.to_string()
    } else {
        message
    }
}

fn follow_ups(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// `POST /ai-chat/filters`
pub async fn filters_chat(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<FilterChatResponse>>, ApiError> {
    let message = validate_message(&request.message)?;
    let suggestions = state.shared.ai_service.suggest_filters(message).await;

    Ok(Json(ApiResponse::success(FilterChatResponse {
        response: or_default(
            suggestions.message,
            "He analizado tu solicitud y sugiero estos filtros:",
        ),
        filters: FilterProposal {
            suggested_filters: suggestions.suggested_filters,
            explanation: suggestions.explanation,
        },
        suggestions: follow_ups(&FILTER_FOLLOW_UPS),
    })))
}

/// `POST /ai-chat/columns`
///
/// With `search_id` the suggestions take that search's query into account.
pub async fn columns_chat(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ColumnChatResponse>>, ApiError> {
    let message = validate_message(&request.message)?;

    let context = match request.search_id {
        Some(search_id) => Some(
            load_owned_search(&state.shared.store, user.id, search_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Search", search_id))?
                .query,
        ),
        None => None,
    };

    let suggestions = state
        .shared
        .ai_service
        .suggest_columns(message, context.as_deref())
        .await;

    Ok(Json(ApiResponse::success(ColumnChatResponse {
        response: or_default(
            suggestions.message,
            "Basándome en tu búsqueda, sugiero estas columnas personalizadas:",
        ),
        columns: suggestions.suggested_columns,
        suggestions: follow_ups(&COLUMN_FOLLOW_UPS),
    })))
}

/// `POST /support/chat`
pub async fn support_chat(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ApiResponse<SupportChatResponse>>, ApiError> {
    let message = validate_message(&request.message)?;
    let reply = state.shared.ai_service.support_reply(message).await;

    Ok(Json(ApiResponse::success(SupportChatResponse {
        response: reply.message,
        suggested_actions: reply.suggested_actions,
        helpful_links: reply.helpful_links,
    })))
}
