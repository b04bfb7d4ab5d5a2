use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::db::{ColumnRecord, Store};
use crate::services::ai::AiService;
use crate::services::results::load_owned_search;

/// Names a custom column may not take because item edits address them directly.
const RESERVED_NAMES: [&str; 11] = [
    "id", "title", "url", "snippet", "country", "language", "date", "category", "status",
    "source", "score",
];

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Search {0} not found")]
    SearchNotFound(i32),

    #[error("Column '{0}' already exists for this search")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for ColumnError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ColumnError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnValueDto {
    pub result_id: i32,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnDto {
    pub id: i32,
    pub search_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub generated_by_ai: bool,
    pub created_at: String,
    pub values: Vec<ColumnValueDto>,
}

impl ColumnDto {
    fn new(column: ColumnRecord, values: Vec<ColumnValueDto>) -> Self {
        Self {
            id: column.id,
            search_id: column.search_id,
            name: column.name,
            description: column.description,
            generated_by_ai: column.generated_by_ai,
            created_at: column.created_at,
            values,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewColumn {
    pub search_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub generate_data: bool,
}

pub struct ColumnService {
    store: Store,
    ai: Arc<AiService>,
}

impl ColumnService {
    #[must_use]
    pub const fn new(store: Store, ai: Arc<AiService>) -> Self {
        Self { store, ai }
    }

    /// Creates a column and, when asked, fills one value per stored result.
    pub async fn create(&self, user_id: i32, request: NewColumn) -> Result<ColumnDto, ColumnError> {
        let name = validate_column_name(&request.name)?;
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let search = load_owned_search(&self.store, user_id, request.search_id)
            .await?
            .ok_or(ColumnError::SearchNotFound(request.search_id))?;

        if self.store.find_column(search.id, &name).await?.is_some() {
            return Err(ColumnError::Conflict(name));
        }

        let column = match self
            .store
            .create_column(search.id, &name, description, request.generate_data)
            .await
        {
            Ok(column) => column,
            Err(e) => {
                return Err(if self.store.find_column(search.id, &name).await?.is_some() {
                    ColumnError::Conflict(name)
                } else {
                    ColumnError::from(e)
                });
            }
        };

        let mut values = Vec::new();
        if request.generate_data {
            let results = self.store.list_results(search.id).await?;
            let hits: Vec<_> = results.iter().map(|r| r.hit.clone()).collect();
            let generated = self
                .ai
                .generate_column_values(&column.name, description.unwrap_or(&column.name), &hits)
                .await;

            let rows: Vec<(i32, Option<String>)> = results
                .iter()
                .zip(generated)
                .map(|(result, value)| (result.id, Some(value)))
                .collect();
            self.store.upsert_column_values(column.id, &rows).await?;

            values = rows
                .into_iter()
                .map(|(result_id, value)| ColumnValueDto { result_id, value })
                .collect();
        }

        info!(
            user_id,
            search_id = search.id,
            column = %column.name,
            values = values.len(),
            "Created custom column"
        );

        Ok(ColumnDto::new(column, values))
    }

    pub async fn list(&self, user_id: i32, search_id: i32) -> Result<Vec<ColumnDto>, ColumnError> {
        let search = load_owned_search(&self.store, user_id, search_id)
            .await?
            .ok_or(ColumnError::SearchNotFound(search_id))?;

        let columns = self.store.list_columns(search.id).await?;
        let results = self.store.list_results(search.id).await?;
        let ids: Vec<i32> = columns.iter().map(|c| c.id).collect();
        let values = self.store.column_values(&ids).await?;

        Ok(columns
            .into_iter()
            .map(|column| {
                let column_values = results
                    .iter()
                    .filter_map(|result| {
                        values.get(&(column.id, result.id)).map(|value| ColumnValueDto {
                            result_id: result.id,
                            value: value.clone(),
                        })
                    })
                    .collect();
                ColumnDto::new(column, column_values)
            })
            .collect())
    }
}

fn validate_column_name(name: &str) -> Result<String, ColumnError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ColumnError::Validation("Column name cannot be empty".to_string()));
    }
    if name.chars().count() > 100 {
        return Err(ColumnError::Validation(
            "Column name must be 100 characters or less".to_string(),
        ));
    }
    if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
        return Err(ColumnError::Validation(format!(
            "'{name}' is a built-in result field"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_column_name() {
        assert_eq!(validate_column_name("  Funding ").unwrap(), "Funding");
        assert!(validate_column_name("").is_err());
        assert!(validate_column_name("Status").is_err());
        assert!(validate_column_name(&"x".repeat(101)).is_err());
    }
}
