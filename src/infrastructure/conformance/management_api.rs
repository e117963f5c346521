//! Create/delete round-trip against the engine's management API

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::document::schema::DEFAULT_WORKFLOW_NAME;
use crate::domain::document::WorkflowDocument;
use crate::domain::{ConformanceResult, ConformanceTester, ConformanceTransport, DomainError};
use crate::infrastructure::http_client::{HttpClientTrait, HttpRequest};

const API_KEY_HEADER: &str = "X-N8N-API-KEY";

/// Fields the create endpoint rejects as read-only
const READ_ONLY_FIELDS: &[&str] = &[
    "id",
    "active",
    "tags",
    "versionId",
    "meta",
    "pinData",
    "createdAt",
    "updatedAt",
];

const DISPOSABLE_PREFIX: &str = "[repair-test]";

#[derive(Debug)]
pub struct ManagementApiTester<C: HttpClientTrait> {
    client: C,
    base_url: String,
    api_key: String,
}

impl<C: HttpClientTrait> ManagementApiTester<C> {
    pub fn new(client: C, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn workflows_url(&self) -> String {
        format!("{}/workflows", self.base_url)
    }

    /// Document body with read-only fields removed and a disposable name
    fn create_body(document: &WorkflowDocument) -> Value {
        let mut body: Map<String, Value> = document
            .as_map()
            .iter()
            .filter(|(key, _)| !READ_ONLY_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let name = document.name().unwrap_or(DEFAULT_WORKFLOW_NAME);
        body.insert(
            "name".to_string(),
            Value::String(format!("{} {} {}", DISPOSABLE_PREFIX, Uuid::new_v4(), name)),
        );
        body.entry("settings")
            .or_insert_with(|| Value::Object(Map::new()));
        body.entry("connections")
            .or_insert_with(|| Value::Object(Map::new()));

        Value::Object(body)
    }

    fn created_id(body: &Value) -> Option<String> {
        let id = body.get("id").or_else(|| body.pointer("/data/id"))?;
        match id {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Best-effort cleanup; failures are logged, never raised
    async fn delete(&self, id: &str) {
        let request = HttpRequest::delete(format!("{}/{}", self.workflows_url(), id))
            .header(API_KEY_HEADER, self.api_key.as_str());

        match self.client.send(request).await {
            Ok(response) if response.is_success() => {
                debug!(workflow_id = %id, "Deleted disposable workflow");
            }
            Ok(response) => {
                warn!(workflow_id = %id, status = response.status, "Failed to delete disposable workflow");
            }
            Err(e) => {
                warn!(workflow_id = %id, error = %e, "Failed to delete disposable workflow");
            }
        }
    }
}

#[async_trait]
impl<C: HttpClientTrait> ConformanceTester for ManagementApiTester<C> {
    async fn test(&self, document: &WorkflowDocument) -> Result<ConformanceResult, DomainError> {
        let request = HttpRequest::post(self.workflows_url())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(Self::create_body(document))
            .non_idempotent();

        let response = self.client.send(request).await?;

        if response.status == 401 || response.status == 403 {
            return Ok(ConformanceResult::failed(format!(
                "Authentication failed: {}",
                response.error_message()
            )));
        }

        if response.status >= 500 {
            return Err(DomainError::provider(
                "management_api",
                response.error_message(),
            ));
        }

        if !response.is_success() {
            return Ok(ConformanceResult::failed(response.error_message())
                .with_details(response.body));
        }

        match Self::created_id(&response.body) {
            Some(id) => self.delete(&id).await,
            None => warn!("Engine accepted workflow without returning an id; nothing to clean up"),
        }

        Ok(ConformanceResult::passed())
    }

    fn transport(&self) -> ConformanceTransport {
        ConformanceTransport::ManagementApi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::{HttpClient, RetryPolicy, RetryingHttpClient};
    use std::time::Duration;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, ManagementApiTester<HttpClient>) {
        let server = MockServer::start().await;
        let tester = ManagementApiTester::new(HttpClient::new(), format!("{}/api/v1/", server.uri()), "test-key");
        (server, tester)
    }

    fn document() -> WorkflowDocument {
        WorkflowDocument::from_value(json!({
            "id": "old",
            "name": "Orders",
            "active": true,
            "tags": [],
            "nodes": [],
            "connections": {},
            "settings": {"executionOrder": "v1"}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_accepted_workflow_is_deleted() {
        let (server, tester) = setup().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/workflows"))
            .and(header("X-N8N-API-KEY", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "wf-9"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/api/v1/workflows/wf-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "wf-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = tester.test(&document()).await.unwrap();
        assert!(result.success);
        assert!(!result.is_skipped());

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("id").is_none());
        assert!(body.get("active").is_none());
        assert!(body.get("tags").is_none());
        let name = body["name"].as_str().unwrap();
        assert!(name.starts_with("[repair-test] "));
        assert!(name.ends_with(" Orders"));
    }

    #[tokio::test]
    async fn test_rejection_is_a_failed_result() {
        let (server, tester) = setup().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/workflows"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "request/body must NOT have additional properties"})),
            )
            .mount(&server)
            .await;

        let result = tester.test(&document()).await.unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("HTTP 400: request/body must NOT have additional properties")
        );
    }

    #[tokio::test]
    async fn test_failed_cleanup_still_passes() {
        let (server, tester) = setup().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/workflows"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 12}})))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/api/v1/workflows/12"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let result = tester.test(&document()).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_server_error_is_transport_failure() {
        let (server, tester) = setup().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/workflows"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let result = tester.test(&document()).await;
        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_create_is_sent_once_through_retrying_client() {
        let server = MockServer::start().await;
        let client = RetryingHttpClient::new(
            HttpClient::new(),
            RetryPolicy::default()
                .with_max_retries(3)
                .with_base_delay(Duration::from_millis(1)),
        );
        let tester = ManagementApiTester::new(client, format!("{}/api/v1", server.uri()), "test-key");

        Mock::given(method("POST"))
            .and(path("/api/v1/workflows"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let result = tester.test(&document()).await;
        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }

    #[tokio::test]
    async fn test_bad_api_key() {
        let (server, tester) = setup().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/workflows"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "unauthorized"})))
            .mount(&server)
            .await;

        let result = tester.test(&document()).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Authentication failed"));
        assert_eq!(tester.transport(), ConformanceTransport::ManagementApi);
    }
}
