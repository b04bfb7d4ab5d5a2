pub mod bing;
pub mod google;
pub mod newsapi;
pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::result::{ResultFilters, SearchHit};

/// A third-party web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// False when the credentials the provider needs are missing.
    fn is_configured(&self) -> bool;

    /// `hints` narrow the provider query where the API supports it; they are not applied
    /// to the returned hits.
    async fn search(&self, query: &str, hints: &ResultFilters, limit: u32)
    -> Result<Vec<SearchHit>>;
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    provider: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{provider} returned status {status}: {body}");
    }

    response
        .json()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to parse {provider} response: {e}"))
}
