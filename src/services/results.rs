//! Search runs, stored result sets, refinement, item edits and history.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::db::{ColumnRecord, ResultPatch, ResultRecord, SearchRecord, Store};
use crate::models::result::{ResultFilters, SearchHit, paginate};
use crate::services::ai::{AiService, QueryInterpretation};
use crate::services::search::{ProviderReport, SearchService};

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for ResultError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ResultError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A result as the API shows it. Unpersisted results have no id.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultItem {
    pub id: Option<i32>,
    pub search_id: Option<i32>,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub country: String,
    pub language: String,
    pub date: String,
    pub category: String,
    pub status: String,
    pub source: String,
    pub score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Custom column values by column name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, String>,
}

impl ResultItem {
    pub(crate) fn from_hit(hit: SearchHit, id: Option<i32>, search_id: Option<i32>) -> Self {
        Self {
            id,
            search_id,
            title: hit.title,
            url: hit.url,
            snippet: hit.snippet,
            country: hit.country,
            language: hit.language,
            date: hit.date,
            category: hit.category,
            status: hit.status,
            source: hit.source,
            score: hit.score,
            metadata: hit.metadata,
            columns: BTreeMap::new(),
        }
    }

    fn matches(&self, filters: &ResultFilters) -> bool {
        filters.matches(
            &self.country,
            &self.language,
            &self.category,
            &self.status,
            &self.source,
        )
    }
}

impl From<ResultRecord> for ResultItem {
    fn from(record: ResultRecord) -> Self {
        Self::from_hit(record.hit, Some(record.id), Some(record.search_id))
    }
}

#[derive(Debug, Clone)]
pub struct SearchRun {
    pub search_id: Option<i32>,
    pub results: Vec<ResultItem>,
    pub providers: Vec<ProviderReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiSearchOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<i32>,
    pub results: Vec<ResultItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<ResultFilters>,
    pub interpretation: QueryInterpretation,
    pub providers: Vec<ProviderReport>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub page: u64,
    pub page_size: u64,
    pub filters: ResultFilters,
    pub search_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<i32>,
    pub results: Vec<ResultItem>,
    pub total: usize,
    pub page: u64,
    pub page_size: u64,
    /// Per-provider outcome of a fresh aggregation; empty for stored result sets.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefineOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<i32>,
    pub filters: ResultFilters,
    pub results: Vec<ResultItem>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i32,
    pub query: String,
    pub filters: ResultFilters,
    pub created_at: String,
    pub results_count: u64,
    pub columns_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPage {
    pub searches: Vec<HistoryEntry>,
    pub total: u64,
}

/// Returns the search when it exists and belongs to `user_id`.
pub async fn load_owned_search(
    store: &Store,
    user_id: i32,
    search_id: i32,
) -> anyhow::Result<Option<SearchRecord>> {
    Ok(store
        .get_search(search_id)
        .await?
        .filter(|search| search.user_id == user_id))
}

/// Stored results of a search with their custom column values.
pub async fn load_items(store: &Store, search_id: i32) -> anyhow::Result<Vec<ResultItem>> {
    let records = store.list_results(search_id).await?;
    let columns = store.list_columns(search_id).await?;
    let values = column_value_lookup(store, &columns).await?;

    Ok(records
        .into_iter()
        .map(|record| {
            let id = record.id;
            let mut item = ResultItem::from(record);
            item.columns = columns_for(&columns, &values, id);
            item
        })
        .collect())
}

async fn column_value_lookup(
    store: &Store,
    columns: &[ColumnRecord],
) -> anyhow::Result<crate::db::ValueMap> {
    let ids: Vec<i32> = columns.iter().map(|c| c.id).collect();
    store.column_values(&ids).await
}

fn columns_for(
    columns: &[ColumnRecord],
    values: &crate::db::ValueMap,
    result_id: i32,
) -> BTreeMap<String, String> {
    columns
        .iter()
        .filter_map(|column| {
            values
                .get(&(column.id, result_id))
                .cloned()
                .flatten()
                .map(|value| (column.name.clone(), value))
        })
        .collect()
}

pub struct ResultService {
    store: Store,
    search: Arc<SearchService>,
    ai: Arc<AiService>,
}

impl ResultService {
    #[must_use]
    pub const fn new(store: Store, search: Arc<SearchService>, ai: Arc<AiService>) -> Self {
        Self { store, search, ai }
    }

    /// Runs the aggregator and, for a known user, stores the search and its results.
    pub async fn run_search(
        &self,
        user_id: Option<i32>,
        query: &str,
        hints: &ResultFilters,
    ) -> Result<SearchRun, ResultError> {
        let query = required_query(Some(query))?;
        let outcome = self.search.search(query, hints).await;

        let Some(user_id) = user_id else {
            return Ok(SearchRun {
                search_id: None,
                results: outcome
                    .hits
                    .into_iter()
                    .map(|hit| ResultItem::from_hit(hit, None, None))
                    .collect(),
                providers: outcome.providers,
            });
        };

        let search = self.store.create_search(user_id, query, hints).await?;
        let stored = self
            .store
            .insert_new_results(search.id, &outcome.hits)
            .await?;

        info!(
            user_id,
            search_id = search.id,
            results = stored.len(),
            "Stored search results"
        );

        Ok(SearchRun {
            search_id: Some(search.id),
            results: stored.into_iter().map(ResultItem::from).collect(),
            providers: outcome.providers,
        })
    }

    pub async fn ai_search(
        &self,
        user_id: Option<i32>,
        query: &str,
        create_filters: bool,
    ) -> Result<AiSearchOutcome, ResultError> {
        let query = required_query(Some(query))?;
        let interpretation = self.ai.interpret_query(query).await;
        let run = self
            .run_search(user_id, query, &interpretation.filters)
            .await?;

        Ok(AiSearchOutcome {
            search_id: run.search_id,
            results: run.results,
            filters: create_filters.then(|| interpretation.filters.clone()),
            interpretation,
            providers: run.providers,
        })
    }

    /// Fresh aggregation, or a stored result set when `search_id` is given.
    /// Without a query the sample set is browsed, when sample data is enabled.
    pub async fn search_page(
        &self,
        user_id: Option<i32>,
        params: SearchParams,
    ) -> Result<SearchPage, ResultError> {
        let query = params
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let (search_id, items, providers) = if let Some(search_id) = params.search_id {
            let user_id = user_id.ok_or(ResultError::Unauthorized)?;
            let search = self.owned_search(user_id, search_id).await?;
            let items = load_items(&self.store, search.id).await?;
            (Some(search.id), items, Vec::new())
        } else if let Some(query) = query {
            let run = self.run_search(user_id, query, &params.filters).await?;
            (run.search_id, run.results, run.providers)
        } else {
            let hits = self.search.browse_samples().ok_or_else(|| {
                ResultError::Validation("Search query cannot be empty".to_string())
            })?;
            let items = hits
                .into_iter()
                .map(|hit| ResultItem::from_hit(hit, None, None))
                .collect();
            (None, items, Vec::new())
        };

        let matching: Vec<ResultItem> = items
            .into_iter()
            .filter(|item| item.matches(&params.filters))
            .collect();
        let total = matching.len();

        Ok(SearchPage {
            search_id,
            results: paginate(matching, params.page, params.page_size),
            total,
            page: params.page,
            page_size: params.page_size,
            providers,
        })
    }

    pub async fn refine(
        &self,
        user_id: Option<i32>,
        filters: ResultFilters,
        search_id: Option<i32>,
        query: Option<&str>,
    ) -> Result<RefineOutcome, ResultError> {
        let filters = filters.normalized();

        let (search_id, items) = match (search_id, query) {
            (Some(search_id), _) => {
                let user_id = user_id.ok_or(ResultError::Unauthorized)?;
                let search = self.owned_search(user_id, search_id).await?;
                (Some(search.id), load_items(&self.store, search.id).await?)
            }
            (None, Some(query)) => {
                let run = self.run_search(None, query, &filters).await?;
                (None, run.results)
            }
            (None, None) => {
                return Err(ResultError::Validation(
                    "Either search_id or query is required".to_string(),
                ));
            }
        };

        let results: Vec<ResultItem> = items
            .into_iter()
            .filter(|item| item.matches(&filters))
            .collect();

        Ok(RefineOutcome {
            search_id,
            total: results.len(),
            filters,
            results,
        })
    }

    /// Applies a JSON object of base fields and custom column values to one result.
    pub async fn update_item(
        &self,
        user_id: i32,
        result_id: i32,
        fields: Map<String, Value>,
    ) -> Result<ResultItem, ResultError> {
        if fields.is_empty() {
            return Err(ResultError::Validation("No fields to update".to_string()));
        }

        let record = self
            .store
            .get_result(result_id)
            .await?
            .ok_or_else(|| ResultError::NotFound(format!("Item {result_id}")))?;
        if load_owned_search(&self.store, user_id, record.search_id)
            .await?
            .is_none()
        {
            return Err(ResultError::NotFound(format!("Item {result_id}")));
        }

        let columns = self.store.list_columns(record.search_id).await?;
        let by_name: HashMap<&str, &ColumnRecord> =
            columns.iter().map(|c| (c.name.as_str(), c)).collect();

        let mut patch = ResultPatch::default();
        let mut column_writes = Vec::new();

        for (key, value) in fields {
            match key.as_str() {
                "title" => patch.title = Some(expect_text(&key, &value)?),
                "snippet" => patch.snippet = Some(expect_text(&key, &value)?),
                "country" => patch.country = Some(expect_text(&key, &value)?),
                "language" => patch.language = Some(expect_text(&key, &value)?),
                "date" => patch.date = Some(expect_text(&key, &value)?),
                "category" => patch.category = Some(expect_text(&key, &value)?),
                "status" => patch.status = Some(expect_text(&key, &value)?),
                "source" => patch.source = Some(expect_text(&key, &value)?),
                "score" => patch.score = Some(expect_score(&value)?),
                other => {
                    let column = by_name.get(other).ok_or_else(|| {
                        ResultError::Validation(format!("Unknown field '{other}'"))
                    })?;
                    let value = match value {
                        Value::Null => None,
                        Value::String(s) => Some(s),
                        _ => {
                            return Err(ResultError::Validation(format!(
                                "Field '{other}' must be a string or null"
                            )));
                        }
                    };
                    column_writes.push((column.id, value));
                }
            }
        }

        let updated = self
            .store
            .update_result(result_id, patch)
            .await?
            .ok_or_else(|| ResultError::NotFound(format!("Item {result_id}")))?;

        for (column_id, value) in column_writes {
            self.store
                .upsert_column_values(column_id, &[(result_id, value)])
                .await?;
        }

        let values = column_value_lookup(&self.store, &columns).await?;
        let mut item = ResultItem::from(updated);
        item.columns = columns_for(&columns, &values, result_id);

        info!(user_id, result_id, "Updated result");
        Ok(item)
    }

    pub async fn history(
        &self,
        user_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<HistoryPage, ResultError> {
        let (searches, total) = self.store.list_searches(user_id, page, page_size).await?;

        let mut entries = Vec::with_capacity(searches.len());
        for search in searches {
            entries.push(HistoryEntry {
                results_count: self.store.count_results(search.id).await?,
                columns_count: self.store.count_columns(search.id).await?,
                id: search.id,
                query: search.query,
                filters: search.filters,
                created_at: search.created_at,
            });
        }

        Ok(HistoryPage {
            searches: entries,
            total,
        })
    }

    async fn owned_search(
        &self,
        user_id: i32,
        search_id: i32,
    ) -> Result<SearchRecord, ResultError> {
        load_owned_search(&self.store, user_id, search_id)
            .await?
            .ok_or_else(|| ResultError::NotFound(format!("Search {search_id}")))
    }
}

fn required_query(query: Option<&str>) -> Result<&str, ResultError> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ResultError::Validation("Search query cannot be empty".to_string()))
}

fn expect_text(key: &str, value: &Value) -> Result<String, ResultError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ResultError::Validation(format!("Field '{key}' must be a string")))
}

fn expect_score(value: &Value) -> Result<i32, ResultError> {
    value
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| ResultError::Validation("Field 'score' must be an integer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_query() {
        assert_eq!(required_query(Some("  ai  ")).unwrap(), "ai");
        assert!(required_query(Some("   ")).is_err());
        assert!(required_query(None).is_err());
    }

    #[test]
    fn test_field_type_checks() {
        assert_eq!(expect_text("title", &json!("x")).unwrap(), "x");
        assert!(expect_text("title", &json!(1)).is_err());
        assert_eq!(expect_score(&json!(77)).unwrap(), 77);
        assert!(expect_score(&json!("77")).is_err());
        assert!(expect_score(&json!(1.5)).is_err());
        assert!(expect_score(&json!(i64::MAX)).is_err());
    }

    #[test]
    fn test_item_filtering() {
        let mut hit = SearchHit::new("t", "https://a", "Google");
        hit.country = "ES".to_string();
        let item = ResultItem::from_hit(hit, None, None);

        let es = ResultFilters {
            country: Some("ES".into()),
            ..Default::default()
        };
        let de = ResultFilters {
            country: Some("DE".into()),
            ..Default::default()
        };
        assert!(item.matches(&es));
        assert!(!item.matches(&de));
    }

    #[test]
    fn test_unpersisted_item_serialization() {
        let item = ResultItem::from_hit(SearchHit::new("t", "https://a", "Bing"), None, None);
        let json = serde_json::to_value(&item).unwrap();

        assert!(json["id"].is_null());
        assert!(json.get("columns").is_none());
        assert_eq!(json["status"], "Activo");
    }
}
