use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{SearchProvider, read_json};
use crate::models::result::{ResultFilters, SearchHit, language_code};

const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";
const NEWSAPI_SCORE: i32 = 90;

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    source: Option<ArticleSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ArticleSource {
    name: Option<String>,
}

#[derive(Clone)]
pub struct NewsApiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl NewsApiClient {
    #[must_use]
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: NEWSAPI_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn request_url(&self, query: &str, hints: &ResultFilters, limit: u32) -> Result<Url> {
        let Some(key) = &self.api_key else {
            anyhow::bail!("NewsAPI is not configured");
        };

        let mut params = vec![
            ("apiKey", key.clone()),
            ("q", query.to_string()),
            ("pageSize", limit.to_string()),
            ("sortBy", "relevancy".to_string()),
        ];
        if let Some(language) = &hints.language {
            params.push(("language", language_code(language)));
        }

        Url::parse_with_params(&self.base_url, &params).context("Invalid NewsAPI URL")
    }
}

#[async_trait]
impl SearchProvider for NewsApiClient {
    fn name(&self) -> &'static str {
        "NewsAPI"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(
        &self,
        query: &str,
        hints: &ResultFilters,
        limit: u32,
    ) -> Result<Vec<SearchHit>> {
        let url = self.request_url(query, hints, limit)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach NewsAPI")?;

        let data: EverythingResponse = read_json("NewsAPI", response).await?;
        Ok(data.articles.into_iter().map(into_hit).collect())
    }
}

fn into_hit(article: Article) -> SearchHit {
    let metadata = serde_json::to_value(&article).ok();
    let source = article
        .source
        .and_then(|s| s.name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "NewsAPI".to_string());

    let mut hit = SearchHit::new(
        article.title.unwrap_or_default(),
        article.url.unwrap_or_default(),
        source,
    );
    hit.snippet = article.description.unwrap_or_default();
    hit.category = "News".to_string();
    hit.score = NEWSAPI_SCORE;
    if let Some(published) = article.published_at.filter(|p| p.len() >= 10) {
        hit.date = published.chars().take(10).collect();
    }
    hit.metadata = metadata;
    hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_mapping() {
        let json = r#"{"articles":[
            {"title":"N","url":"https://n.example","description":"d",
             "publishedAt":"2024-03-05T10:00:00Z","source":{"name":"El País"}},
            {"title":"M","url":"https://m.example","source":{"name":null}}
        ]}"#;
        let data: EverythingResponse = serde_json::from_str(json).unwrap();
        let hits: Vec<SearchHit> = data.articles.into_iter().map(into_hit).collect();

        assert_eq!(hits[0].date, "2024-03-05");
        assert_eq!(hits[0].source, "El País");
        assert_eq!(hits[0].category, "News");
        assert_eq!(hits[0].score, 90);
        assert_eq!(hits[1].source, "NewsAPI");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn test_language_hint() {
        let client = NewsApiClient::new(Client::new(), Some("k".into()));
        let hints = ResultFilters {
            language: Some("Francés".into()),
            country: Some("FR".into()),
            ..Default::default()
        };
        let url = client.request_url("q", &hints, 10).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("language".into(), "fr".into())));
        assert!(pairs.contains(&("sortBy".into(), "relevancy".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "country"));
    }
}
