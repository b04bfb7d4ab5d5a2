//! Saved searches re-run on a fixed interval.
//!
//! A run stores the URLs the search has not stored before; those rows are the
//! run's "new" results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use crate::db::{AutomationRecord, SearchRecord, Store};
use crate::models::automation::AutomationInterval;
use crate::models::format_timestamp;
use crate::models::result::ResultFilters;
use crate::services::results::{ResultItem, load_owned_search};
use crate::services::search::SearchService;

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AutomationError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AutomationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AutomationView {
    pub id: i32,
    pub search_id: i32,
    pub query: String,
    pub interval: String,
    pub filters: ResultFilters,
    pub next_run: String,
    pub last_run: Option<String>,
    pub is_active: bool,
    pub last_new_results: i32,
    pub created_at: String,
}

impl AutomationView {
    fn new(record: AutomationRecord, search: &SearchRecord) -> Self {
        Self {
            id: record.id,
            search_id: record.search_id,
            query: search.query.clone(),
            interval: record.frequency,
            filters: search.filters.clone(),
            next_run: record.next_run,
            last_run: record.last_run,
            is_active: record.is_active,
            last_new_results: record.last_new_results,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub automation_id: i32,
    pub search_id: i32,
    pub new_results: Vec<ResultItem>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DueRunSummary {
    pub checked: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub new_results: usize,
}

#[derive(Debug, Clone)]
pub struct NewAutomation {
    pub query: String,
    pub interval: String,
    pub filters: ResultFilters,
    pub search_id: Option<i32>,
}

pub struct AutomationService {
    store: Store,
    search: Arc<SearchService>,
}

impl AutomationService {
    #[must_use]
    pub const fn new(store: Store, search: Arc<SearchService>) -> Self {
        Self { store, search }
    }

    /// Registers an automation. Without `search_id` a new search is created and a
    /// baseline run stores its current results.
    pub async fn create(
        &self,
        user_id: i32,
        request: NewAutomation,
    ) -> Result<AutomationView, AutomationError> {
        let interval: AutomationInterval = request
            .interval
            .parse()
            .map_err(AutomationError::Validation)?;

        let search = if let Some(search_id) = request.search_id {
            load_owned_search(&self.store, user_id, search_id)
                .await?
                .ok_or_else(|| AutomationError::NotFound(format!("Search {search_id}")))?
        } else {
            let query = request.query.trim();
            if query.is_empty() {
                return Err(AutomationError::Validation(
                    "Search query cannot be empty".to_string(),
                ));
            }

            let filters = request.filters.normalized();
            let search = self.store.create_search(user_id, query, &filters).await?;
            let baseline = self.search.search(&search.query, &search.filters).await;
            let stored = self
                .store
                .insert_new_results(search.id, &baseline.hits)
                .await?;
            info!(search_id = search.id, results = stored.len(), "Stored automation baseline");
            search
        };

        let next_run = format_timestamp(Utc::now() + interval.duration());
        let record = self
            .store
            .create_automation(user_id, search.id, interval, &next_run)
            .await?;

        info!(
            user_id,
            automation_id = record.id,
            search_id = search.id,
            interval = %interval,
            "Created automation"
        );

        Ok(AutomationView::new(record, &search))
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<AutomationView>, AutomationError> {
        let records = self.store.list_automations(user_id).await?;

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            if let Some(search) = self.store.get_search(record.search_id).await? {
                views.push(AutomationView::new(record, &search));
            }
        }
        Ok(views)
    }

    pub async fn cancel(&self, user_id: i32, id: i32) -> Result<AutomationView, AutomationError> {
        let (record, search) = self.owned(user_id, id).await?;
        self.store.deactivate_automation(record.id).await?;

        info!(user_id, automation_id = id, "Cancelled automation");

        let mut view = AutomationView::new(record, &search);
        view.is_active = false;
        Ok(view)
    }

    /// Runs one automation immediately, whether or not it is due.
    pub async fn run_now(&self, user_id: i32, id: i32) -> Result<RunReport, AutomationError> {
        let (record, _) = self.owned(user_id, id).await?;
        self.run_one(&record, Utc::now()).await
    }

    /// Runs every active automation whose `next_run` has passed. One failure
    /// does not stop the rest.
    pub async fn run_due(&self, now: DateTime<Utc>) -> Result<DueRunSummary, AutomationError> {
        let due = self
            .store
            .list_due_automations(&format_timestamp(now))
            .await?;

        let mut summary = DueRunSummary {
            checked: due.len(),
            ..DueRunSummary::default()
        };

        for record in &due {
            let start = Instant::now();
            match self.run_one(record, now).await {
                Ok(report) => {
                    summary.succeeded += 1;
                    summary.new_results += report.new_results.len();
                    let duration_ms =
                        u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    info!(
                        automation_id = record.id,
                        new_results = report.new_results.len(),
                        duration_ms,
                        "Automation run finished"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(automation_id = record.id, error = %e, "Automation run failed");
                }
            }
        }

        metrics::counter!("radar_automation_runs_total", "outcome" => "success")
            .increment(summary.succeeded as u64);
        metrics::counter!("radar_automation_runs_total", "outcome" => "failure")
            .increment(summary.failed as u64);

        Ok(summary)
    }

    async fn run_one(
        &self,
        record: &AutomationRecord,
        now: DateTime<Utc>,
    ) -> Result<RunReport, AutomationError> {
        let interval: AutomationInterval = record
            .frequency
            .parse()
            .map_err(AutomationError::Internal)?;
        let search = self
            .store
            .get_search(record.search_id)
            .await?
            .ok_or_else(|| AutomationError::NotFound(format!("Search {}", record.search_id)))?;

        let outcome = self.search.search(&search.query, &search.filters).await;
        let inserted = self
            .store
            .insert_new_results(search.id, &outcome.hits)
            .await?;

        let new_count = i32::try_from(inserted.len()).unwrap_or(i32::MAX);
        self.store
            .record_automation_run(
                record.id,
                &format_timestamp(now),
                &format_timestamp(now + interval.duration()),
                new_count,
            )
            .await?;

        Ok(RunReport {
            automation_id: record.id,
            search_id: search.id,
            new_results: inserted.into_iter().map(ResultItem::from).collect(),
        })
    }

    async fn owned(
        &self,
        user_id: i32,
        id: i32,
    ) -> Result<(AutomationRecord, SearchRecord), AutomationError> {
        let not_found = || AutomationError::NotFound(format!("Automation {id}"));

        let record = self
            .store
            .get_automation(id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or_else(not_found)?;
        let search = self
            .store
            .get_search(record.search_id)
            .await?
            .ok_or_else(not_found)?;

        Ok((record, search))
    }
}
