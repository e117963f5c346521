//! Cache keys

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::document::WorkflowDocument;

/// Content hash of the input document's canonical serialization.
///
/// Key order and whitespace in the source never change the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_document(document: &WorkflowDocument) -> Self {
        Self(document.content_hash())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
