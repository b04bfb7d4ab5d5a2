use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{SearchProvider, read_json};
use crate::models::result::{ResultFilters, SearchHit, country_code, language_code};

const GOOGLE_API: &str = "https://www.googleapis.com/customsearch/v1";
const GOOGLE_SCORE: i32 = 85;

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize, serde::Serialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(rename = "displayLink", default, skip_serializing_if = "Option::is_none")]
    display_link: Option<String>,
}

#[derive(Clone)]
pub struct GoogleClient {
    client: Client,
    api_key: Option<String>,
    cx: Option<String>,
    base_url: String,
}

impl GoogleClient {
    #[must_use]
    pub fn new(client: Client, api_key: Option<String>, cx: Option<String>) -> Self {
        Self {
            client,
            api_key,
            cx,
            base_url: GOOGLE_API.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn request_url(&self, query: &str, hints: &ResultFilters, limit: u32) -> Result<Url> {
        let (Some(key), Some(cx)) = (&self.api_key, &self.cx) else {
            anyhow::bail!("Google search is not configured");
        };

        let num = limit.clamp(1, 10).to_string();
        let mut params = vec![
            ("key", key.clone()),
            ("cx", cx.clone()),
            ("q", query.to_string()),
            ("num", num),
        ];
        if let Some(country) = &hints.country {
            params.push(("cr", format!("country{}", country_code(country))));
        }
        if let Some(language) = &hints.language {
            params.push(("lr", format!("lang_{}", language_code(language))));
        }

        Url::parse_with_params(&self.base_url, &params).context("Invalid Google search URL")
    }
}

#[async_trait]
impl SearchProvider for GoogleClient {
    fn name(&self) -> &'static str {
        "Google"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.cx.is_some()
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
            .context("Failed to reach Google Custom Search")?;

        let data: CustomSearchResponse = read_json("Google", response).await?;
        Ok(data.items.into_iter().map(into_hit).collect())
    }
}

fn into_hit(item: Item) -> SearchHit {
    let metadata = serde_json::to_value(&item).ok();
    let mut hit = SearchHit::new(item.title, item.link, "Google");
    hit.snippet = item.snippet;
    hit.score = GOOGLE_SCORE;
    hit.metadata = metadata;
    hit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_carries_hints() {
        let client = GoogleClient::new(Client::new(), Some("k".into()), Some("cx1".into()));
        let hints = ResultFilters {
            country: Some("ES".into()),
            language: Some("Español".into()),
            ..Default::default()
        };

        let url = client.request_url("startups", &hints, 10).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("q".into(), "startups".into())));
        assert!(pairs.contains(&("cr".into(), "countryES".into())));
        assert!(pairs.contains(&("lr".into(), "lang_es".into())));
        assert!(pairs.contains(&("num".into(), "10".into())));
    }

    #[test]
    fn test_unconfigured_client() {
        let client = GoogleClient::new(Client::new(), Some("k".into()), None);
        assert!(!client.is_configured());
        assert!(client.request_url("q", &ResultFilters::default(), 10).is_err());
    }

    #[test]
    fn test_parse_items() {
        let json = r#"{"items":[{"title":"A","link":"https://a.example","snippet":"s"}]}"#;
        let data: CustomSearchResponse = serde_json::from_str(json).unwrap();
        let hits: Vec<SearchHit> = data.items.into_iter().map(into_hit).collect();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://a.example");
        assert_eq!(hits[0].score, 85);
        assert_eq!(hits[0].category, "Web");
        assert_eq!(hits[0].country, "Unknown");
    }

    #[test]
    fn test_missing_items_is_empty() {
        let data: CustomSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(data.items.is_empty());
    }
}
