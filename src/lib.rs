//! PMP Workflow Repair
//!
//! Validation and repair engine for generated n8n workflow documents:
//! - Structural validation with scoring and suggestions
//! - Deterministic normalization of common generator mistakes
//! - Engine error classification into targeted fixes
//! - Bounded test/fix/regenerate repair sessions with outcome caching

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use domain::DomainError;
use infrastructure::cache::InMemoryRepairCache;
use infrastructure::conformance::create_tester;
use infrastructure::generator::create_generator;
use infrastructure::services::RepairService;
use tracing::info;

/// Wire the repair service from configuration
pub fn create_repair_service(config: &AppConfig) -> Result<RepairService, DomainError> {
    let cache = Arc::new(InMemoryRepairCache::from_config(&config.cache));
    let tester = create_tester(&config.engine)?;

    let mut service = RepairService::new(cache, tester, config.repair.clone());
    if let Some(generator) = create_generator(&config.generator)? {
        service = service.with_generator(generator);
    }

    info!(
        transport = %service.transport(),
        generator = service.generator_name().unwrap_or("none"),
        max_attempts = config.repair.max_attempts,
        "Repair service initialized"
    );

    Ok(service)
}

/// Create the application state with all services initialized
pub fn create_app_state(config: &AppConfig) -> Result<AppState, DomainError> {
    Ok(AppState::new(create_repair_service(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConformanceTransport;

    #[test]
    fn test_default_config_runs_untested_without_generator() {
        let service = create_repair_service(&AppConfig::default()).unwrap();

        assert_eq!(service.transport(), ConformanceTransport::Untested);
        assert!(service.generator_name().is_none());
    }

    #[test]
    fn test_management_api_without_key_is_rejected() {
        let mut config = AppConfig::default();
        config.engine.api_url = Some("http://localhost:5678/api/v1".to_string());

        assert!(matches!(
            create_app_state(&config),
            Err(DomainError::Configuration { .. })
        ));
    }
}
