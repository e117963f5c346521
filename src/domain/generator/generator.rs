//! Generator trait

use async_trait::async_trait;

use crate::domain::classifier::ErrorClassification;
use crate::domain::document::WorkflowDocument;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Produces a new candidate document from the current one and the error
/// the engine reported. The returned text is raw model output; callers
/// extract the document with [`super::extract_document`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkflowGenerator: Send + Sync {
    async fn regenerate(
        &self,
        current: &WorkflowDocument,
        prompt: &str,
        classification: &ErrorClassification,
    ) -> Result<String, DomainError>;

    /// Provider label for logs and readiness reporting
    fn name(&self) -> &'static str;
}
