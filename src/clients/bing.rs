use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{SearchProvider, read_json};
use crate::models::result::{ResultFilters, SearchHit, country_code, language_code};

const BING_API: &str = "https://api.bing.microsoft.com/v7.0/search";
const BING_SCORE: i32 = 80;

#[derive(Debug, Deserialize)]
struct BingResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WebPage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
    #[serde(rename = "dateLastCrawled", default, skip_serializing_if = "Option::is_none")]
    date_last_crawled: Option<String>,
}

#[derive(Clone)]
pub struct BingClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl BingClient {
    #[must_use]
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: BING_API.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn request_url(&self, query: &str, hints: &ResultFilters, limit: u32) -> Result<Url> {
        let mut params = vec![
            ("q", query.to_string()),
            ("count", limit.to_string()),
            ("responseFilter", "Webpages".to_string()),
        ];
        if let Some(country) = &hints.country {
            params.push(("cc", country_code(country)));
        }
        if let Some(language) = &hints.language {
            params.push(("setLang", language_code(language)));
        }

        Url::parse_with_params(&self.base_url, &params).context("Invalid Bing search URL")
    }
}

#[async_trait]
impl SearchProvider for BingClient {
    fn name(&self) -> &'static str {
        "Bing"
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
        let Some(key) = &self.api_key else {
            anyhow::bail!("Bing search is not configured");
        };
        let url = self.request_url(query, hints, limit)?;

        let response = self
            .client
            .get(url)
            .header("Ocp-Apim-Subscription-Key", key)
            .send()
            .await
            .context("Failed to reach Bing Web Search")?;

        let data: BingResponse = read_json("Bing", response).await?;
        Ok(data
            .web_pages
            .map(|pages| pages.value)
            .unwrap_or_default()
            .into_iter()
            .map(into_hit)
            .collect())
    }
}

fn into_hit(page: WebPage) -> SearchHit {
    let metadata = serde_json::to_value(&page).ok();
    let mut hit = SearchHit::new(page.name, page.url, "Bing");
    hit.snippet = page.snippet;
    hit.score = BING_SCORE;
    hit.metadata = metadata;
    hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url() {
        let client = BingClient::new(Client::new(), Some("k".into()));
        let hints = ResultFilters {
            country: Some("USA".into()),
            language: Some("Inglés".into()),
            ..Default::default()
        };

        let url = client.request_url("ai", &hints, 10).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("responseFilter".into(), "Webpages".into())));
        assert!(pairs.contains(&("cc".into(), "US".into())));
        assert!(pairs.contains(&("setLang".into(), "en".into())));
        assert!(pairs.contains(&("count".into(), "10".into())));
    }

    #[test]
    fn test_parse_web_pages() {
        let json = r#"{"webPages":{"value":[{"name":"B","url":"https://b.example","snippet":"x"}]}}"#;
        let data: BingResponse = serde_json::from_str(json).unwrap();
        let hits: Vec<SearchHit> = data
            .web_pages
            .unwrap()
            .value
            .into_iter()
            .map(into_hit)
            .collect();

        assert_eq!(hits[0].title, "B");
        assert_eq!(hits[0].score, 80);
        assert_eq!(hits[0].source, "Bing");
    }
}
