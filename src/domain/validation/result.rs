//! Validation result types

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Points subtracted from the score for an error of this severity
    pub fn penalty(&self) -> u32 {
        match self {
            Self::Critical => 40,
            Self::High => 20,
            Self::Medium => 10,
            Self::Low => 5,
        }
    }
}

/// Machine-readable issue codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueKind {
    InvalidDocument,
    MissingField,
    EmptyNodes,
    InvalidNode,
    InvalidConnections,
    DuplicateNodeName,
    DuplicateNodeId,
    InvalidPosition,
    UnknownNodeType,
    NonCanonicalNodeType,
    InvalidTypeVersion,
    InvalidParameters,
    LegacyParameters,
    InvalidChannel,
    MissingCredentials,
    DanglingConnection,
    MalformedConnection,
    OrphanedNode,
    NoTrigger,
    CycleDetected,
    UnknownField,
    UnknownSetting,
    LegacyExpression,
    NoErrorHandling,
    MissingRequiredNode,
    ComplexityMismatch,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidDocument => "INVALID_DOCUMENT",
            Self::MissingField => "MISSING_FIELD",
            Self::EmptyNodes => "EMPTY_NODES",
            Self::InvalidNode => "INVALID_NODE",
            Self::InvalidConnections => "INVALID_CONNECTIONS",
            Self::DuplicateNodeName => "DUPLICATE_NODE_NAME",
            Self::DuplicateNodeId => "DUPLICATE_NODE_ID",
            Self::InvalidPosition => "INVALID_POSITION",
            Self::UnknownNodeType => "UNKNOWN_NODE_TYPE",
            Self::NonCanonicalNodeType => "NON_CANONICAL_NODE_TYPE",
            Self::InvalidTypeVersion => "INVALID_TYPE_VERSION",
            Self::InvalidParameters => "INVALID_PARAMETERS",
            Self::LegacyParameters => "LEGACY_PARAMETERS",
            Self::InvalidChannel => "INVALID_CHANNEL",
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::DanglingConnection => "DANGLING_CONNECTION",
            Self::MalformedConnection => "MALFORMED_CONNECTION",
            Self::OrphanedNode => "ORPHANED_NODE",
            Self::NoTrigger => "NO_TRIGGER",
            Self::CycleDetected => "CYCLE_DETECTED",
            Self::UnknownField => "UNKNOWN_FIELD",
            Self::UnknownSetting => "UNKNOWN_SETTING",
            Self::LegacyExpression => "LEGACY_EXPRESSION",
            Self::NoErrorHandling => "NO_ERROR_HANDLING",
            Self::MissingRequiredNode => "MISSING_REQUIRED_NODE",
            Self::ComplexityMismatch => "COMPLEXITY_MISMATCH",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single error or warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            severity,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Outcome of one validation call; rebuilt from scratch every time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub suggestions: Vec<String>,
    pub score: u8,
}

impl ValidationResult {
    /// Result for input that failed the schema check
    pub fn rejected(issue: ValidationIssue) -> Self {
        Self {
            is_valid: false,
            errors: vec![issue],
            warnings: Vec::new(),
            suggestions: Vec::new(),
            score: 0,
        }
    }

    pub fn has_error(&self, kind: IssueKind) -> bool {
        self.errors.iter().any(|issue| issue.kind == kind)
    }

    pub fn has_warning(&self, kind: IssueKind) -> bool {
        self.warnings.iter().any(|issue| issue.kind == kind)
    }

    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_kind_serializes_as_code() {
        let json = serde_json::to_string(&IssueKind::DuplicateNodeName).unwrap();
        assert_eq!(json, "\"DUPLICATE_NODE_NAME\"");
        assert_eq!(IssueKind::DuplicateNodeName.to_string(), "DUPLICATE_NODE_NAME");
    }

    #[test]
    fn test_rejected_result() {
        let result = ValidationResult::rejected(ValidationIssue::new(
            IssueKind::InvalidDocument,
            Severity::Critical,
            "not an object",
        ));

        assert!(!result.is_valid);
        assert_eq!(result.score, 0);
        assert!(result.has_error(IssueKind::InvalidDocument));
        assert_eq!(result.issue_count(), 1);
    }

    #[test]
    fn test_result_uses_camel_case() {
        let result = ValidationResult::rejected(ValidationIssue::new(
            IssueKind::EmptyNodes,
            Severity::Critical,
            "no nodes",
        ));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["isValid"], false);
    }
}
