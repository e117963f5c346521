//! Caller-controlled policy checks

use serde::{Deserialize, Serialize};

use super::complexity::ComplexityLevel;
use crate::domain::document::NodeFamily;

/// Optional policy checks; all disabled by default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Warn when no node declares failure handling
    pub require_error_handling: bool,
    /// Families that must appear at least once
    pub required_families: Vec<NodeFamily>,
    /// Complexity level the caller asked the generator for
    pub target_complexity: Option<ComplexityLevel>,
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_handling(mut self) -> Self {
        self.require_error_handling = true;
        self
    }

    pub fn with_required_family(mut self, family: NodeFamily) -> Self {
        self.required_families.push(family);
        self
    }

    pub fn with_target_complexity(mut self, level: ComplexityLevel) -> Self {
        self.target_complexity = Some(level);
        self
    }
}
