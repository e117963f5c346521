//! Request and response bodies for the workflow endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ApiError;
use crate::domain::{RepairOptions, ValidationOptions, WorkflowDocument};
use crate::infrastructure::services::timeout_from_secs;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairRequestOptions {
    #[serde(default, alias = "max_attempts")]
    pub max_attempts: Option<u32>,
    #[serde(default, alias = "bypass_cache")]
    pub bypass_cache: Option<bool>,
    #[serde(default, alias = "timeout_secs")]
    pub timeout_secs: Option<u64>,
}

impl RepairRequestOptions {
    /// Overlay the request's options on the service defaults
    pub fn apply(&self, defaults: RepairOptions) -> RepairOptions {
        let mut options = defaults;
        if let Some(max_attempts) = self.max_attempts {
            options = options.with_max_attempts(max_attempts);
        }
        if let Some(bypass_cache) = self.bypass_cache {
            options = options.with_bypass_cache(bypass_cache);
        }
        if let Some(timeout) = timeout_from_secs(self.timeout_secs) {
            options = options.with_timeout(timeout);
        }
        options
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepairRequest {
    pub workflow: Value,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub options: RepairRequestOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    pub workflow: Value,
    #[serde(default)]
    pub options: ValidationOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixRequest {
    pub workflow: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixResponse {
    pub workflow: WorkflowDocument,
    pub suggestions: Vec<String>,
    pub applied: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyRequest {
    pub error: String,
}

/// Require the `workflow` field to be a JSON object
pub fn parse_workflow(value: Value) -> Result<WorkflowDocument, ApiError> {
    WorkflowDocument::from_value(value).map_err(|e| {
        ApiError::bad_request(e.to_string())
            .with_param("workflow")
            .with_code("invalid_workflow")
    })
}
