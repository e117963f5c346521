//! HTTP transport shared by the engine testers and the generator
//!
//! [`RetryingHttpClient`] retries transient failures (connection errors,
//! timeouts, 429 and 5xx) with exponential backoff. This is independent of
//! the repair loop's own attempts. Requests marked non-idempotent are only
//! retried on 429, where the server has refused the request outright.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::DomainError;

/// Outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub idempotent: bool,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            idempotent: true,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The request may have taken effect even when no response arrived
    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }
}

/// Response with any status; non-JSON bodies arrive as a JSON string
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Worth retrying at the transport level
    pub fn is_transient(&self) -> bool {
        self.status == 429 || self.status >= 500
    }

    /// Best human-readable error text from the body
    pub fn error_message(&self) -> String {
        let message = match &self.body {
            Value::String(text) => Some(text.clone()),
            Value::Object(map) => map
                .get("message")
                .or_else(|| map.get("error"))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    Value::Object(inner) => inner
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| v.to_string()),
                    other => other.to_string(),
                }),
            _ => None,
        };

        match message {
            Some(message) if !message.is_empty() => format!("HTTP {}: {}", self.status, message),
            _ => format!("HTTP {}", self.status),
        }
    }
}

#[async_trait]
pub trait HttpClientTrait: Send + Sync + Debug {
    /// Send a request; any HTTP status is `Ok`, only transport failures are `Err`
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DomainError>;

    /// POST JSON and require a 2xx response
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &Value,
    ) -> Result<Value, DomainError> {
        let mut request = HttpRequest::post(url).json(body.clone());
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = self.send(request).await?;
        if !response.is_success() {
            return Err(DomainError::provider("http", response.error_message()));
        }

        Ok(response.body)
    }
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DomainError> {
        let mut builder = self.client.request(request.method, &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DomainError::timeout(format!("Request to {} timed out", request.url))
            } else {
                DomainError::provider("http", format!("Request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| DomainError::provider("http", format!("Failed to read response: {}", e)))?;

        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(HttpResponse::new(status, body))
    }
}

/// Backoff schedule for transport retries
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Exponential delay with up to 50% jitter, capped at `max_delay`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponential = self.base_delay.saturating_mul(2u32.saturating_pow(retry));
        let capped = exponential.min(self.max_delay);
        let jitter_ms = capped.as_millis() as u64 / 2;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        capped + Duration::from_millis(jitter)
    }
}

/// Wraps a client and retries transient failures
#[derive(Debug)]
pub struct RetryingHttpClient<C: HttpClientTrait> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: HttpClientTrait> RetryingHttpClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<C: HttpClientTrait> HttpClientTrait for RetryingHttpClient<C> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DomainError> {
        let mut retry = 0;

        loop {
            let result = self.inner.send(request.clone()).await;

            let transient = match &result {
                Ok(response) if !request.idempotent => response.status == 429,
                Ok(response) => response.is_transient(),
                Err(_) if !request.idempotent => false,
                Err(error) => error.is_transient(),
            };

            if !transient || retry >= self.policy.max_retries {
                if transient {
                    warn!(url = %request.url, retries = retry, "Giving up on transient failure");
                }
                return result;
            }

            let delay = self.policy.delay_for(retry);
            debug!(
                url = %request.url,
                retry = retry + 1,
                delay_ms = delay.as_millis() as u64,
                "Retrying transient HTTP failure"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays queued results and records every request
    #[derive(Debug, Default)]
    pub struct MockHttpClient {
        results: Mutex<VecDeque<Result<HttpResponse, DomainError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, status: u16, body: Value) -> Self {
            self.results
                .lock()
                .unwrap()
                .push_back(Ok(HttpResponse::new(status, body)));
            self
        }

        pub fn with_error(self, error: DomainError) -> Self {
            self.results.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClientTrait for MockHttpClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DomainError> {
            self.requests.lock().unwrap().push(request);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DomainError::provider("mock", "No mock response queued")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockHttpClient;
    use super::*;
    use serde_json::json;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_retries_transient_status_then_succeeds() {
        let inner = MockHttpClient::new()
            .with_response(503, json!("unavailable"))
            .with_response(429, json!({"message": "slow down"}))
            .with_response(200, json!({"id": "1"}));
        let client = RetryingHttpClient::new(inner, fast_policy(2));

        let response = client.send(HttpRequest::post("http://engine/workflows")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(client.inner.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let inner = MockHttpClient::new()
            .with_response(400, json!({"message": "bad"}))
            .with_response(200, json!({}));
        let client = RetryingHttpClient::new(inner, fast_policy(3));

        let response = client.send(HttpRequest::post("http://engine")).await.unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(client.inner.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = MockHttpClient::new()
            .with_error(DomainError::provider("http", "connection reset"))
            .with_error(DomainError::timeout("slow"))
            .with_error(DomainError::provider("http", "connection reset"));
        let client = RetryingHttpClient::new(inner, fast_policy(1));

        let result = client.send(HttpRequest::post("http://engine")).await;

        assert!(matches!(result, Err(DomainError::Timeout { .. })));
        assert_eq!(client.inner.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_non_idempotent_request_not_resent_after_timeout() {
        let inner = MockHttpClient::new()
            .with_error(DomainError::timeout("slow"))
            .with_response(200, json!({"id": "2"}));
        let client = RetryingHttpClient::new(inner, fast_policy(3));

        let result = client
            .send(HttpRequest::post("http://engine/workflows").non_idempotent())
            .await;

        assert!(matches!(result, Err(DomainError::Timeout { .. })));
        assert_eq!(client.inner.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_non_idempotent_request_retried_only_on_rate_limit() {
        let inner = MockHttpClient::new()
            .with_response(429, json!({"message": "slow down"}))
            .with_response(502, json!("bad gateway"))
            .with_response(200, json!({}));
        let client = RetryingHttpClient::new(inner, fast_policy(3));

        let response = client
            .send(HttpRequest::post("http://engine/workflows").non_idempotent())
            .await
            .unwrap();

        assert_eq!(response.status, 502);
        assert_eq!(client.inner.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_post_json_requires_success() {
        let client = MockHttpClient::new().with_response(401, json!({"error": {"message": "bad key"}}));
        let result = client.post_json("http://llm", vec![], &json!({})).await;

        match result {
            Err(DomainError::Provider { message, .. }) => assert_eq!(message, "HTTP 401: bad key"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_for(20) <= Duration::from_millis(7500));
        assert!(policy.delay_for(0) >= Duration::from_millis(250));
    }
}
