use std::time::Duration;

use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub repair: RepairConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Repair loop defaults
#[derive(Debug, Clone, Deserialize)]
pub struct RepairConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    /// Skip conformance testing for trivially simple documents
    #[serde(default = "default_true")]
    pub fast_path_enabled: bool,
    /// Also cache sessions that exhausted their attempts
    #[serde(default)]
    pub cache_exhausted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

/// Target engine transports; neither set means untested mode
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Management API base URL, e.g. `https://n8n.example.com/api/v1`
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Validation webhook probed with `{workflow}`
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_http_retries")]
    pub max_retries: u32,
}

/// OpenAI-compatible regeneration backend; disabled without an API key
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_generator_model")]
    pub model: String,
    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_http_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_session_timeout_secs() -> u64 {
    120
}

fn default_cache_capacity() -> u64 {
    1_000
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_http_retries() -> u32 {
    2
}

fn default_generator_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generator_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_generator_timeout_secs() -> u64 {
    60
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            session_timeout_secs: default_session_timeout_secs(),
            fast_path_enabled: true,
            cache_exhausted: false,
        }
    }
}

impl RepairConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            webhook_url: None,
            timeout_secs: default_http_timeout_secs(),
            max_retries: default_http_retries(),
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_generator_url(),
            api_key: None,
            model: default_generator_model(),
            timeout_secs: default_generator_timeout_secs(),
            max_retries: default_http_retries(),
        }
    }
}

impl GeneratorConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_start_untested_without_generator() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.repair.max_attempts, 3);
        assert!(config.repair.fast_path_enabled);
        assert!(!config.repair.cache_exhausted);
        assert!(config.engine.api_url.is_none());
        assert!(config.engine.webhook_url.is_none());
        assert!(!config.generator.is_enabled());
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [engine]
                webhook_url = "http://localhost:5678/webhook/validate"

                [repair]
                max_attempts = 5
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.repair.max_attempts, 5);
        assert_eq!(config.repair.session_timeout_secs, 120);
        assert_eq!(config.engine.timeout_secs, 30);
        assert_eq!(
            config.engine.webhook_url.as_deref(),
            Some("http://localhost:5678/webhook/validate")
        );
        assert_eq!(config.logging.level, "info");
    }
}
