use async_trait::async_trait;

use crate::domain::document::WorkflowDocument;
use crate::domain::{ConformanceResult, ConformanceTester, ConformanceTransport, DomainError};

const SKIPPED_NOTE: &str = "No conformance transport configured; engine testing skipped";

/// Accepts every document when no engine transport is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UntestedTester;

#[async_trait]
impl ConformanceTester for UntestedTester {
    async fn test(&self, _document: &WorkflowDocument) -> Result<ConformanceResult, DomainError> {
        Ok(ConformanceResult::skipped(SKIPPED_NOTE))
    }

    fn transport(&self) -> ConformanceTransport {
        ConformanceTransport::Untested
    }
}
