use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::clients::SearchProvider;
use crate::clients::bing::BingClient;
use crate::clients::google::GoogleClient;
use crate::clients::newsapi::NewsApiClient;
use crate::config::Config;
use crate::models::result::{ResultFilters, SearchHit};
use crate::services::samples::sample_hits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Live,
    Sample,
    Failed,
    Skipped,
}

impl ProviderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Sample => "sample",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderReport {
    pub provider: &'static str,
    pub status: ProviderStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub providers: Vec<ProviderReport>,
}

/// Fans a query out to every provider and merges the answers.
pub struct SearchService {
    providers: Vec<Arc<dyn SearchProvider>>,
    results_per_provider: u32,
    mock_fallback: bool,
}

impl SearchService {
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn SearchProvider>>,
        results_per_provider: u32,
        mock_fallback: bool,
    ) -> Self {
        Self {
            providers,
            results_per_provider,
            mock_fallback,
        }
    }

    /// Google, Bing and NewsAPI, in merge order.
    #[must_use]
    pub fn from_config(http: &reqwest::Client, config: &Config) -> Self {
        let p = &config.providers;
        let providers: Vec<Arc<dyn SearchProvider>> = vec![
            Arc::new(GoogleClient::new(
                http.clone(),
                p.google_api_key.clone(),
                p.google_cx.clone(),
            )),
            Arc::new(BingClient::new(http.clone(), p.bing_api_key.clone())),
            Arc::new(NewsApiClient::new(http.clone(), p.newsapi_key.clone())),
        ];

        Self::new(
            providers,
            p.results_per_provider,
            config.mock_fallback_enabled(),
        )
    }

    /// The built-in sample results, or `None` when sample data is disabled.
    #[must_use]
    pub fn browse_samples(&self) -> Option<Vec<SearchHit>> {
        self.mock_fallback.then(sample_hits)
    }

    /// Never fails: a provider error only empties that provider's contribution.
    pub async fn search(&self, query: &str, hints: &ResultFilters) -> SearchOutcome {
        let start = Instant::now();

        let calls = self
            .providers
            .iter()
            .map(|provider| self.query_provider(provider.as_ref(), query, hints));
        let answers = join_all(calls).await;

        let mut providers = Vec::with_capacity(answers.len());
        let mut lists = Vec::with_capacity(answers.len());
        for (report, hits) in answers {
            providers.push(report);
            lists.push(hits);
        }

        let hits = merge(lists);

        info!(
            query = %query,
            results = hits.len(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Aggregated search finished"
        );

        SearchOutcome { hits, providers }
    }

    async fn query_provider(
        &self,
        provider: &dyn SearchProvider,
        query: &str,
        hints: &ResultFilters,
    ) -> (ProviderReport, Vec<SearchHit>) {
        let name = provider.name();

        let (status, hits) = if provider.is_configured() {
            match provider.search(query, hints, self.results_per_provider).await {
                Ok(hits) => (ProviderStatus::Live, hits),
                Err(e) => {
                    warn!(provider = name, error = %e, "Search provider failed");
                    (ProviderStatus::Failed, Vec::new())
                }
            }
        } else if self.mock_fallback {
            debug!(provider = name, "Provider not configured, using sample results");
            (ProviderStatus::Sample, sample_hits())
        } else {
            debug!(provider = name, "Provider not configured, skipping");
            (ProviderStatus::Skipped, Vec::new())
        };

        metrics::counter!(
            "radar_provider_requests_total",
            "provider" => name,
            "status" => status.as_str()
        )
        .increment(1);

        (
            ProviderReport {
                provider: name,
                status,
                count: hits.len(),
            },
            hits,
        )
    }
}

/// Concatenates lists in order, keeping the first hit per URL and dropping hits without one.
#[must_use]
pub fn merge(lists: Vec<Vec<SearchHit>>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|hit| !hit.url.is_empty() && seen.insert(hit.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedProvider {
        name: &'static str,
        configured: bool,
        answer: Result<Vec<SearchHit>, String>,
    }

    #[async_trait]
    impl SearchProvider for FixedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn search(
            &self,
            _query: &str,
            _hints: &ResultFilters,
            _limit: u32,
        ) -> anyhow::Result<Vec<SearchHit>> {
            self.answer.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn hit(url: &str, source: &str) -> SearchHit {
        SearchHit::new(format!("title {url}"), url, source)
    }

    fn provider(
        name: &'static str,
        configured: bool,
        answer: Result<Vec<SearchHit>, String>,
    ) -> Arc<dyn SearchProvider> {
        Arc::new(FixedProvider {
            name,
            configured,
            answer,
        })
    }

    #[test]
    fn test_merge_keeps_first_url() {
        let merged = merge(vec![
            vec![hit("https://a", "Google"), hit("https://b", "Google")],
            vec![hit("https://b", "Bing"), hit("", "Bing"), hit("https://c", "Bing")],
        ]);

        let urls: Vec<&str> = merged.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
        assert_eq!(merged[1].source, "Google");
    }

    #[tokio::test]
    async fn test_failing_provider_contributes_nothing() {
        let service = SearchService::new(
            vec![
                provider("Google", true, Err("boom".into())),
                provider("Bing", true, Ok(vec![hit("https://b", "Bing")])),
            ],
            10,
            true,
        );

        let outcome = service.search("q", &ResultFilters::default()).await;

        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.providers[0].status, ProviderStatus::Failed);
        assert_eq!(outcome.providers[1].status, ProviderStatus::Live);
    }

    #[tokio::test]
    async fn test_unconfigured_providers_fall_back_to_samples() {
        let service = SearchService::new(
            vec![
                provider("Google", false, Ok(vec![])),
                provider("Bing", false, Ok(vec![])),
            ],
            10,
            true,
        );

        let outcome = service.search("q", &ResultFilters::default()).await;

        assert_eq!(outcome.hits, sample_hits());
        assert!(
            outcome
                .providers
                .iter()
                .all(|p| p.status == ProviderStatus::Sample)
        );
    }

    #[test]
    fn test_browse_samples_follows_fallback_setting() {
        let on = SearchService::new(Vec::new(), 10, true);
        let off = SearchService::new(Vec::new(), 10, false);

        assert_eq!(on.browse_samples().map(|hits| hits.len()), Some(sample_hits().len()));
        assert!(off.browse_samples().is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_providers_skipped_without_fallback() {
        let service = SearchService::new(vec![provider("Google", false, Ok(vec![]))], 10, false);

        let outcome = service.search("q", &ResultFilters::default()).await;

        assert!(outcome.hits.is_empty());
        assert_eq!(outcome.providers[0].status, ProviderStatus::Skipped);
    }
}
