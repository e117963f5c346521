//! Transport selection from configuration

use std::sync::Arc;

use tracing::info;

use crate::config::EngineConfig;
use crate::domain::{ConformanceTester, DomainError};
use crate::infrastructure::http_client::{HttpClient, RetryPolicy, RetryingHttpClient};

use super::management_api::ManagementApiTester;
use super::untested::UntestedTester;
use super::webhook::WebhookTester;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn http_client(config: &EngineConfig) -> Result<RetryingHttpClient<HttpClient>, DomainError> {
    let client = HttpClient::with_timeout(config.timeout())?;
    let policy = RetryPolicy::default().with_max_retries(config.max_retries);
    Ok(RetryingHttpClient::new(client, policy))
}

/// Management API when a URL and key are set, else the webhook probe,
/// else untested mode
pub fn create_tester(config: &EngineConfig) -> Result<Arc<dyn ConformanceTester>, DomainError> {
    match (non_empty(&config.api_url), non_empty(&config.api_key)) {
        (Some(url), Some(key)) => {
            info!(url = %url, "Conformance testing via management API");
            return Ok(Arc::new(ManagementApiTester::new(http_client(config)?, url, key)));
        }
        (Some(_), None) => {
            return Err(DomainError::configuration(
                "engine.api_url is set but engine.api_key is missing",
            ));
        }
        _ => {}
    }

    if let Some(url) = non_empty(&config.webhook_url) {
        info!(url = %url, "Conformance testing via validation webhook");
        return Ok(Arc::new(WebhookTester::new(http_client(config)?, url)));
    }

    info!("No conformance transport configured; running in untested mode");
    Ok(Arc::new(UntestedTester))
}
