mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, EngineConfig, GeneratorConfig, LogFormat, LoggingConfig,
    MetricsConfig, RepairConfig, ServerConfig,
};
