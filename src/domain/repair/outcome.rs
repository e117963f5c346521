//! Repair session outcome and attempt history

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::classifier::ErrorClassification;
use crate::domain::document::WorkflowDocument;
use crate::domain::validation::ValidationResult;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Caller-supplied session options
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOptions {
    pub max_attempts: u32,
    pub bypass_cache: bool,
    /// Whole-session deadline; the service default applies when unset
    pub timeout: Option<Duration>,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            bypass_cache: false,
            timeout: None,
        }
    }
}

impl RepairOptions {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_bypass_cache(mut self, bypass_cache: bool) -> Self {
        self.bypass_cache = bypass_cache;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// How one attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    Failed,
    /// The tester itself failed to reach the engine
    ValidationError,
    TimedOut,
}

/// One entry of the session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub attempt: u32,
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ErrorClassification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes_applied: Vec<String>,
    #[serde(default)]
    pub regenerated: bool,
    pub duration_ms: u64,
}

impl AttemptRecord {
    pub fn new(attempt: u32, status: AttemptStatus) -> Self {
        Self {
            attempt,
            status,
            error: None,
            classification: None,
            fixes_applied: Vec::new(),
            regenerated: false,
            duration_ms: 0,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_classification(mut self, classification: ErrorClassification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }
}

/// Result of a repair session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub success: bool,
    /// Best document produced so far
    pub workflow: WorkflowDocument,
    /// Tester invocations made
    pub attempts: u32,
    pub history: Vec<AttemptRecord>,
    /// Whether the engine (or an untested transport) accepted the document
    pub validated: bool,
    pub last_error: Option<String>,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
}

impl RepairOutcome {
    /// Whether any attempt ran out of time
    pub fn timed_out(&self) -> bool {
        self.history
            .iter()
            .any(|record| record.status == AttemptStatus::TimedOut)
    }

    /// Hints from every classified attempt, first occurrence kept
    pub fn collect_hints(history: &[AttemptRecord]) -> Vec<String> {
        let mut hints: Vec<String> = Vec::new();
        for hint in history
            .iter()
            .filter_map(|record| record.classification.as_ref())
            .map(|classification| classification.hint.clone())
            .filter(|hint| !hint.is_empty())
        {
            if !hints.contains(&hint) {
                hints.push(hint);
            }
        }
        hints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classifier::{ErrorKind, FixStrategy};
    use serde_json::json;

    fn record(attempt: u32, hint: &str) -> AttemptRecord {
        AttemptRecord::new(attempt, AttemptStatus::Failed).with_classification(
            ErrorClassification::new(ErrorKind::Unknown, FixStrategy::Regenerate, hint),
        )
    }

    #[test]
    fn test_hints_are_deduplicated_in_order() {
        let history = vec![record(1, "b"), record(2, "a"), record(3, "b"), record(4, "")];
        assert_eq!(RepairOutcome::collect_hints(&history), vec!["b", "a"]);
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = RepairOutcome {
            success: false,
            workflow: WorkflowDocument::from_value(json!({"name": "W"})).unwrap(),
            attempts: 1,
            history: vec![AttemptRecord::new(1, AttemptStatus::TimedOut).with_error("deadline")],
            validated: false,
            last_error: Some("deadline".to_string()),
            suggestions: vec![],
            from_cache: false,
            validation: None,
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["lastError"], "deadline");
        assert_eq!(value["fromCache"], false);
        assert_eq!(value["history"][0]["status"], "timed_out");
        assert_eq!(value["history"][0]["durationMs"], 0);
        assert!(outcome.timed_out());
    }

    #[test]
    fn test_default_options() {
        let options = RepairOptions::default();
        assert_eq!(options.max_attempts, 3);
        assert!(!options.bypass_cache);
        assert!(options.timeout.is_none());
    }
}
