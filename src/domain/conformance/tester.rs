//! Conformance tester trait

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::document::WorkflowDocument;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// How documents reach the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConformanceTransport {
    /// Create through the management API, then delete
    ManagementApi,
    /// Single probe against a validation webhook
    Webhook,
    /// No transport configured; every document passes
    Untested,
}

impl ConformanceTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManagementApi => "management_api",
            Self::Webhook => "webhook",
            Self::Untested => "untested",
        }
    }
}

impl fmt::Display for ConformanceTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Engine verdict for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformanceResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Set when the document was accepted without reaching an engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ConformanceResult {
    pub fn passed() -> Self {
        Self {
            success: true,
            error: None,
            details: None,
            note: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            details: None,
            note: None,
        }
    }

    pub fn skipped(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::passed()
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_skipped(&self) -> bool {
        self.success && self.note.is_some()
    }
}

/// Submits a candidate document to the live engine.
///
/// A rejected document is `Ok` with `success = false`; `Err` is reserved for
/// failures to reach the engine at all.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConformanceTester: Send + Sync {
    async fn test(&self, document: &WorkflowDocument) -> Result<ConformanceResult, DomainError>;

    fn transport(&self) -> ConformanceTransport;
}
