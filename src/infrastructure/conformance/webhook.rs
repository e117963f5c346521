//! Single-probe validation webhook

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::document::WorkflowDocument;
use crate::domain::{ConformanceResult, ConformanceTester, ConformanceTransport, DomainError};
use crate::infrastructure::http_client::{HttpClientTrait, HttpRequest};

/// `{valid, error, details}` reply from the probe
#[derive(Debug, Deserialize)]
struct WebhookVerdict {
    valid: bool,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    details: Option<Value>,
}

impl WebhookVerdict {
    fn error_text(&self) -> String {
        match &self.error {
            Some(Value::String(text)) if !text.is_empty() => text.clone(),
            Some(Value::Null) | None => "Workflow rejected by validation webhook".to_string(),
            Some(other) => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct WebhookTester<C: HttpClientTrait> {
    client: C,
    url: String,
}

impl<C: HttpClientTrait> WebhookTester<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClientTrait> ConformanceTester for WebhookTester<C> {
    async fn test(&self, document: &WorkflowDocument) -> Result<ConformanceResult, DomainError> {
        let request = HttpRequest::post(self.url.as_str()).json(json!({"workflow": document}));
        let response = self.client.send(request).await?;

        if response.status >= 500 {
            return Err(DomainError::provider("webhook", response.error_message()));
        }

        // Probes may answer 4xx with a verdict body; anything else is a rejection
        let verdict = match serde_json::from_value::<WebhookVerdict>(response.body.clone()) {
            Ok(verdict) => verdict,
            Err(_) if response.is_success() => {
                return Err(DomainError::parse(format!(
                    "Validation webhook returned an unexpected body: {}",
                    response.body
                )));
            }
            Err(_) => return Ok(ConformanceResult::failed(response.error_message())),
        };

        let result = if verdict.valid {
            ConformanceResult::passed()
        } else {
            ConformanceResult::failed(verdict.error_text())
        };

        Ok(match verdict.details {
            Some(details) if !details.is_null() => result.with_details(details),
            _ => result,
        })
    }

    fn transport(&self) -> ConformanceTransport {
        ConformanceTransport::Webhook
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::HttpClient;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, WebhookTester<HttpClient>) {
        let server = MockServer::start().await;
        let tester = WebhookTester::new(HttpClient::new(), format!("{}/webhook/validate", server.uri()));
        (server, tester)
    }

    fn document() -> WorkflowDocument {
        WorkflowDocument::from_value(json!({"name": "Probe", "nodes": [], "connections": {}})).unwrap()
    }

    #[tokio::test]
    async fn test_valid_verdict() {
        let (server, tester) = setup().await;

        Mock::given(method("POST"))
            .and(path("/webhook/validate"))
            .and(body_partial_json(json!({"workflow": {"name": "Probe"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"valid": true})))
            .expect(1)
            .mount(&server)
            .await;

        let result = tester.test(&document()).await.unwrap();
        assert!(result.success);
        assert_eq!(tester.transport(), ConformanceTransport::Webhook);
    }

    #[tokio::test]
    async fn test_invalid_verdict_carries_error_and_details() {
        let (server, tester) = setup().await;

        Mock::given(method("POST"))
            .and(path("/webhook/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "valid": false,
                "error": "Unrecognized node type: n8n-nodes-base.gmailtrigger",
                "details": {"node": "Mail"}
            })))
            .mount(&server)
            .await;

        let result = tester.test(&document()).await.unwrap();
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Unrecognized node type: n8n-nodes-base.gmailtrigger")
        );
        assert_eq!(result.details, Some(json!({"node": "Mail"})));
    }

    #[tokio::test]
    async fn test_unexpected_success_body_is_an_error() {
        let (server, tester) = setup().await;

        Mock::given(method("POST"))
            .and(path("/webhook/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        assert!(matches!(
            tester.test(&document()).await,
            Err(DomainError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_client_error_without_verdict_is_rejection() {
        let (server, tester) = setup().await;

        Mock::given(method("POST"))
            .and(path("/webhook/validate"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "bad workflow"})))
            .mount(&server)
            .await;

        let result = tester.test(&document()).await.unwrap();
        assert_eq!(result.error.as_deref(), Some("HTTP 422: bad workflow"));
    }
}
