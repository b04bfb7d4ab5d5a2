use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

use radar::clients::SearchProvider;
use radar::config::{Config, SchedulerConfig};
use radar::db::Store;
use radar::models::result::{ResultFilters, SearchHit};
use radar::services::automation::NewAutomation;
use radar::services::{Scheduler, SearchService};
use radar::state::SharedState;

/// Provider whose answer the test rewrites between runs.
struct ScriptedProvider {
    urls: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl ScriptedProvider {
    fn new(urls: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            urls: Mutex::new(urls.iter().map(|u| (*u).to_string()).collect()),
            fail: Mutex::new(false),
        })
    }

    fn set_urls(&self, urls: &[&str]) {
        *self.urls.lock().unwrap() = urls.iter().map(|u| (*u).to_string()).collect();
    }

    fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl SearchProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn search(
        &self,
        query: &str,
        _hints: &ResultFilters,
        _limit: u32,
    ) -> Result<Vec<SearchHit>> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("provider offline");
        }
        Ok(self
            .urls
            .lock()
            .unwrap()
            .iter()
            .map(|url| SearchHit::new(format!("{query}: {url}"), url.clone(), "scripted"))
            .collect())
    }
}

async fn setup(provider: Arc<ScriptedProvider>) -> (SharedState, i32) {
    let path = std::env::temp_dir().join(format!("radar-auto-{}.db", uuid::Uuid::new_v4()));
    let store = Store::new(&format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    let user = store
        .create_user("auto@example.com", "auto-token")
        .await
        .unwrap();

    let search = Arc::new(SearchService::new(vec![provider], 10, false));
    let shared = SharedState::with_parts(Config::default(), store, search).unwrap();
    (shared, user.id)
}

fn new_automation(interval: &str) -> NewAutomation {
    NewAutomation {
        query: "fintech madrid".to_string(),
        interval: interval.to_string(),
        filters: ResultFilters::default(),
        search_id: None,
    }
}

#[tokio::test]
async fn test_baseline_then_new_results_detected() {
    let provider = ScriptedProvider::new(&["https://a.example", "https://b.example"]);
    let (shared, user_id) = setup(provider.clone()).await;
    let automations = &shared.automation_service;

    let view = automations
        .create(user_id, new_automation("24h"))
        .await
        .unwrap();
    assert_eq!(shared.store.count_results(view.search_id).await.unwrap(), 2);

    // Not yet due
    let summary = automations.run_due(Utc::now()).await.unwrap();
    assert_eq!(summary.checked, 0);

    provider.set_urls(&["https://a.example", "https://c.example", "https://c.example"]);
    let later = Utc::now() + Duration::hours(25);
    let summary = automations.run_due(later).await.unwrap();
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.new_results, 1);
    assert_eq!(shared.store.count_results(view.search_id).await.unwrap(), 3);

    let stored = automations.list(user_id).await.unwrap();
    assert_eq!(stored[0].last_new_results, 1);
    assert!(stored[0].last_run.is_some());
    assert!(stored[0].next_run > stored[0].last_run.clone().unwrap());

    // Same answer again: nothing new, and not due until a day later
    let summary = automations.run_due(later).await.unwrap();
    assert_eq!(summary.checked, 0);
    let summary = automations
        .run_due(later + Duration::hours(25))
        .await
        .unwrap();
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.new_results, 0);
}

#[tokio::test]
async fn test_run_now_reports_new_rows() {
    let provider = ScriptedProvider::new(&["https://a.example"]);
    let (shared, user_id) = setup(provider.clone()).await;
    let automations = &shared.automation_service;

    let view = automations
        .create(user_id, new_automation("weekly"))
        .await
        .unwrap();

    provider.set_urls(&["https://a.example", "https://d.example"]);
    let report = automations.run_now(user_id, view.id).await.unwrap();
    assert_eq!(report.automation_id, view.id);
    assert_eq!(report.new_results.len(), 1);
    assert_eq!(report.new_results[0].url, "https://d.example");
    assert!(report.new_results[0].id.is_some());

    assert!(automations.run_now(user_id + 1, view.id).await.is_err());
}

#[tokio::test]
async fn test_concurrent_runs_store_each_url_once() {
    let provider = ScriptedProvider::new(&["https://a.example"]);
    let (shared, user_id) = setup(provider.clone()).await;
    let automations = &shared.automation_service;

    let view = automations
        .create(user_id, new_automation("24h"))
        .await
        .unwrap();

    let fresh: Vec<String> = (0..30).map(|n| format!("https://n{n}.example")).collect();
    let fresh: Vec<&str> = fresh.iter().map(String::as_str).collect();
    provider.set_urls(&fresh);

    let (first, second) = tokio::join!(
        automations.run_now(user_id, view.id),
        automations.run_now(user_id, view.id)
    );
    let first = first.unwrap();
    let second = second.unwrap();

    // Every new URL is reported by exactly one of the two runs
    assert_eq!(first.new_results.len() + second.new_results.len(), 30);
    assert_eq!(shared.store.count_results(view.search_id).await.unwrap(), 31);
}

#[tokio::test]
async fn test_cancelled_automation_is_not_due() {
    let provider = ScriptedProvider::new(&["https://a.example"]);
    let (shared, user_id) = setup(provider).await;
    let automations = &shared.automation_service;

    let view = automations
        .create(user_id, new_automation("monthly"))
        .await
        .unwrap();
    let cancelled = automations.cancel(user_id, view.id).await.unwrap();
    assert!(!cancelled.is_active);

    let summary = automations
        .run_due(Utc::now() + Duration::days(31))
        .await
        .unwrap();
    assert_eq!(summary.checked, 0);
}

#[tokio::test]
async fn test_provider_failure_does_not_fail_the_run() {
    let provider = ScriptedProvider::new(&["https://a.example"]);
    let (shared, user_id) = setup(provider.clone()).await;
    let automations = &shared.automation_service;

    automations
        .create(user_id, new_automation("24h"))
        .await
        .unwrap();
    automations
        .create(user_id, new_automation("24h"))
        .await
        .unwrap();

    provider.set_failing(true);
    let summary = automations
        .run_due(Utc::now() + Duration::hours(25))
        .await
        .unwrap();
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.new_results, 0);
}

#[tokio::test]
async fn test_create_validates_input() {
    let provider = ScriptedProvider::new(&[]);
    let (shared, user_id) = setup(provider).await;
    let automations = &shared.automation_service;

    assert!(automations.create(user_id, new_automation("hourly")).await.is_err());

    let mut blank = new_automation("24h");
    blank.query = "   ".to_string();
    assert!(automations.create(user_id, blank).await.is_err());

    let mut missing = new_automation("24h");
    missing.search_id = Some(9999);
    assert!(automations.create(user_id, missing).await.is_err());
}

#[tokio::test]
async fn test_scheduler_run_once() {
    let provider = ScriptedProvider::new(&["https://a.example"]);
    let (shared, user_id) = setup(provider).await;

    shared
        .automation_service
        .create(user_id, new_automation("24h"))
        .await
        .unwrap();

    let scheduler = Scheduler::new(
        shared.automation_service.clone(),
        SchedulerConfig::default(),
    );
    assert!(!scheduler.is_running().await);

    // Nothing is due right after creation
    let summary = scheduler.run_once().await.unwrap();
    assert_eq!(summary.checked, 0);
    assert_eq!(summary.failed, 0);
}
