use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub providers: ProvidersConfig,

    pub openai: OpenAiConfig,

    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_url: String,

    pub log_level: String,

    /// Deployment environment name ("development", "staging", "production").
    pub environment: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/radar.db".to_string(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

impl GeneralConfig {
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub google_api_key: Option<String>,

    /// Google Programmable Search engine id
    pub google_cx: Option<String>,

    pub bing_api_key: Option<String>,

    pub newsapi_key: Option<String>,

    pub results_per_provider: u32,

    pub request_timeout_seconds: u64,

    /// Serve the built-in sample results for providers without credentials.
    /// Unset means: enabled in development, disabled elsewhere.
    pub mock_fallback: Option<bool>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_cx: None,
            bing_api_key: None,
            newsapi_key: None,
            results_per_provider: 10,
            request_timeout_seconds: 15,
            mock_fallback: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,

    pub model: String,

    pub base_url: String,

    /// Number of result rows sent per column generation request
    pub column_batch_size: usize,

    pub request_timeout_seconds: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            column_batch_size: 20,
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub check_interval_minutes: u32,

    pub cron_expression: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_minutes: 5,
            cron_expression: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Config {
    /// Loads the first config file found, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Overlays the deployment environment variables on top of file values.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            self.general.database_url = url;
        }
        if let Some(env) = non_empty("ENVIRONMENT") {
            self.general.environment = env;
        }
        if let Some(debug) = non_empty("DEBUG")
            && matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes")
        {
            self.general.log_level = "debug".to_string();
        }
        if let Some(port) = non_empty("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value: {port}"),
            }
        }
        if let Some(frontend) = non_empty("FRONTEND_URL")
            && !self.server.cors_allowed_origins.contains(&frontend)
        {
            self.server.cors_allowed_origins.push(frontend);
        }

        if let Some(key) = non_empty("GOOGLE_API_KEY") {
            self.providers.google_api_key = Some(key);
        }
        if let Some(cx) = non_empty("GOOGLE_CX") {
            self.providers.google_cx = Some(cx);
        }
        if let Some(key) = non_empty("BING_API_KEY") {
            self.providers.bing_api_key = Some(key);
        }
        if let Some(key) = non_empty("NEWSAPI_KEY") {
            self.providers.newsapi_key = Some(key);
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }

        if non_empty("REDIS_URL").is_some() {
            warn!("REDIS_URL is set but automations run on the in-process scheduler");
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("radar").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".radar").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_url.trim().is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.scheduler.enabled
            && self.scheduler.check_interval_minutes == 0
            && self.scheduler.cron_expression.is_none()
        {
            anyhow::bail!("Scheduler interval must be > 0 or cron expression must be set");
        }

        if self.openai.column_batch_size == 0 {
            anyhow::bail!("OpenAI column batch size must be > 0");
        }

        Ok(())
    }

    /// Whether unconfigured providers contribute the built-in sample results.
    #[must_use]
    pub fn mock_fallback_enabled(&self) -> bool {
        self.providers
            .mock_fallback
            .unwrap_or_else(|| self.general.is_development())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scheduler.check_interval_minutes, 5);
        assert_eq!(config.providers.results_per_provider, 10);
        assert!(config.general.is_development());
        assert!(config.mock_fallback_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [scheduler]
            check_interval_minutes = 30
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.scheduler.check_interval_minutes, 30);
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("GOOGLE_API_KEY", "g-key"),
            ("GOOGLE_CX", "cx"),
            ("OPENAI_API_KEY", "sk-test"),
            ("ENVIRONMENT", "production"),
            ("DEBUG", "true"),
            ("FRONTEND_URL", "https://radar.example"),
            ("PORT", "9000"),
        ]));

        assert_eq!(config.general.database_url, "sqlite::memory:");
        assert_eq!(config.providers.google_api_key.as_deref(), Some("g-key"));
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.port, 9000);
        assert!(
            config
                .server
                .cors_allowed_origins
                .contains(&"https://radar.example".to_string())
        );
        assert!(!config.mock_fallback_enabled());
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[("BING_API_KEY", "  "), ("PORT", "not-a-port")]));

        assert!(config.providers.bing_api_key.is_none());
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_mock_fallback_override() {
        let mut config = Config::default();
        config.general.environment = "production".to_string();
        config.providers.mock_fallback = Some(true);
        assert!(config.mock_fallback_enabled());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.scheduler.check_interval_minutes = 0;
        assert!(config.validate().is_err());

        config.scheduler.cron_expression = Some("0 */5 * * * *".to_string());
        assert!(config.validate().is_ok());
    }
}
