use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::clients::openai::OpenAiClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AiService, AuthService, AutomationService, ColumnService, ExportService, ResultService,
    SeaOrmAuthService, SearchService,
};

/// Build a shared HTTP client with reasonable defaults for API calls.
/// Reused by every provider client so connections are pooled.
fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .user_agent("RADAR/1.0")
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

fn build_openai_client(config: &Config) -> anyhow::Result<Option<OpenAiClient>> {
    let Some(api_key) = config
        .openai
        .api_key
        .as_deref()
        .filter(|key| !key.trim().is_empty())
    else {
        return Ok(None);
    };

    let http = build_shared_http_client(config.openai.request_timeout_seconds)?;
    Ok(Some(
        OpenAiClient::new(http, api_key, config.openai.model.clone())
            .with_base_url(config.openai.base_url.clone()),
    ))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub search_service: Arc<SearchService>,

    pub ai_service: Arc<AiService>,

    pub result_service: Arc<ResultService>,

    pub column_service: Arc<ColumnService>,

    pub automation_service: Arc<AutomationService>,

    pub export_service: Arc<ExportService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let http_client = build_shared_http_client(config.providers.request_timeout_seconds)?;
        let search_service = Arc::new(SearchService::from_config(&http_client, &config));

        Self::with_parts(config, store, search_service)
    }

    /// Wires the services around an existing store and aggregator.
    pub fn with_parts(
        config: Config,
        store: Store,
        search_service: Arc<SearchService>,
    ) -> anyhow::Result<Self> {
        let openai = build_openai_client(&config)?;
        if openai.is_none() {
            tracing::warn!("OPENAI_API_KEY not set, AI features use keyword fallbacks");
        }
        let ai_service = Arc::new(AiService::new(openai, config.openai.column_batch_size));

        let auth_service =
            Arc::new(SeaOrmAuthService::new(store.clone())) as Arc<dyn AuthService>;

        let result_service = Arc::new(ResultService::new(
            store.clone(),
            search_service.clone(),
            ai_service.clone(),
        ));

        let column_service = Arc::new(ColumnService::new(store.clone(), ai_service.clone()));

        let automation_service = Arc::new(AutomationService::new(
            store.clone(),
            search_service.clone(),
        ));

        let export_service = Arc::new(ExportService::new(store.clone()));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            search_service,
            ai_service,
            result_service,
            column_service,
            automation_service,
            export_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
