use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::domain::{DomainError, ErrorClassification, WorkflowDocument, WorkflowGenerator};
use crate::infrastructure::http_client::{
    HttpClient, HttpClientTrait, RetryPolicy, RetryingHttpClient,
};

const SYSTEM_PROMPT: &str = "You repair n8n workflow JSON documents. \
The target engine rejected the workflow below. Return the complete corrected \
workflow as a single JSON object with `name`, `nodes`, `connections` and \
`settings`. Keep node names stable, use only canonical node type tags, and do \
not add commentary fields or keys starting with an underscore.";

/// OpenAI-compatible chat completions generator
#[derive(Debug)]
pub struct OpenAiWorkflowGenerator<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
}

impl<C: HttpClientTrait> OpenAiWorkflowGenerator<C> {
    pub fn new(
        client: C,
        api_key: impl AsRef<str>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_header: format!("Bearer {}", api_key.as_ref()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn user_prompt(
        current: &WorkflowDocument,
        prompt: &str,
        classification: &ErrorClassification,
    ) -> String {
        let mut text = String::new();
        if !prompt.trim().is_empty() {
            text.push_str(&format!("Original request:\n{}\n\n", prompt.trim()));
        }
        text.push_str(&format!(
            "Engine error ({}): {}\n",
            classification.kind, classification.hint
        ));
        if !classification.captures.is_empty() {
            text.push_str(&format!("Affected: {}\n", classification.captures.join(", ")));
        }
        text.push_str(&format!(
            "\nCurrent workflow:\n```json\n{}\n```",
            current.to_pretty_json()
        ));
        text
    }

    fn build_request(&self, user_prompt: String) -> serde_json::Value {
        let messages = vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: user_prompt,
            },
        ];

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.2,
        })
    }
}

#[async_trait]
impl<C: HttpClientTrait> WorkflowGenerator for OpenAiWorkflowGenerator<C> {
    async fn regenerate(
        &self,
        current: &WorkflowDocument,
        prompt: &str,
        classification: &ErrorClassification,
    ) -> Result<String, DomainError> {
        let body = self.build_request(Self::user_prompt(current, prompt, classification));
        let headers = vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ];

        debug!(model = %self.model, kind = %classification.kind, "Requesting regeneration");

        let json = self
            .client
            .post_json(&self.chat_completions_url(), headers, &body)
            .await?;

        let response: ChatResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("openai", format!("Failed to parse response: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| DomainError::provider("openai", "No content in response"))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Generator from configuration; `None` when no API key is set
pub fn create_generator(
    config: &GeneratorConfig,
) -> Result<Option<Arc<dyn WorkflowGenerator>>, DomainError> {
    let Some(api_key) = config.api_key.as_deref().filter(|_| config.is_enabled()) else {
        return Ok(None);
    };

    let client = RetryingHttpClient::new(
        HttpClient::with_timeout(config.timeout())?,
        RetryPolicy::default().with_max_retries(config.max_retries),
    );

    Ok(Some(Arc::new(OpenAiWorkflowGenerator::new(
        client,
        api_key,
        config.base_url.as_str(),
        config.model.as_str(),
    ))))
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}
