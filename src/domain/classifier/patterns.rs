//! Ordered error pattern table

use once_cell::sync::Lazy;
use regex::Regex;

use super::classification::{ErrorClassification, ErrorKind, FixStrategy};
use crate::domain::DomainError;

/// One row of the classification table
#[derive(Debug, Clone)]
pub struct ErrorPattern {
    regex: Regex,
    kind: ErrorKind,
    strategy: FixStrategy,
    hint: String,
}

impl ErrorPattern {
    /// Compile a row; patterns are matched case-insensitively
    pub fn new(
        pattern: &str,
        kind: ErrorKind,
        strategy: FixStrategy,
        hint: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let regex = Regex::new(&format!("(?i){}", pattern)).map_err(|e| {
            DomainError::configuration(format!("Invalid error pattern '{}': {}", pattern, e))
        })?;

        Ok(Self {
            regex,
            kind,
            strategy,
            hint: hint.into(),
        })
    }

    fn classify(&self, raw: &str) -> Option<ErrorClassification> {
        let caps = self.regex.captures(raw)?;
        let captures = caps
            .iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Some(
            ErrorClassification::new(self.kind, self.strategy, self.hint.clone())
                .with_captures(captures),
        )
    }
}

use ErrorKind as K;
use FixStrategy as S;

/// Built-in rows, most specific first
const DEFAULT_PATTERNS: &[(&str, ErrorKind, FixStrategy, &str)] = &[
    (
        r#"unknown node(?: type)?:?\s*["'`]?([\w@./-]+)["'`]?"#,
        K::UnknownNodeType,
        S::FixNodeType,
        "Use the canonical node type tag for this node",
    ),
    (
        r#"(?:unrecognized node type|node type is not known)[:\s]*["'`]?([\w@./-]+)["'`]?"#,
        K::UnknownNodeType,
        S::FixNodeType,
        "Use the canonical node type tag for this node",
    ),
    (
        r"settings must not have additional properties",
        K::InvalidSettings,
        S::ResetSettings,
        "Only recognized workflow settings may be sent",
    ),
    (
        r#"additional property\s+["'`]([^"'`]+)["'`]"#,
        K::AdditionalProperty,
        S::StripProperty,
        "Remove fields the engine does not accept",
    ),
    (
        r"must not have additional properties",
        K::AdditionalProperty,
        S::StripProperty,
        "Remove fields the engine does not accept",
    ),
    (
        r#"body must have required property\s+["'`]([^"'`]+)["'`]"#,
        K::MissingProperty,
        S::EnsureEnvelope,
        "The workflow is missing a required top-level field",
    ),
    (
        r#"(?:connection|destination|target|source)\b.*?node\s+["'`]([^"'`]+)["'`].*?(?:not found|does not exist|doesn't exist|unknown|missing)"#,
        K::DanglingConnection,
        S::FixConnections,
        "Connections must reference existing node names",
    ),
    (
        r#"node\s+["'`]([^"'`]+)["'`]\s+(?:is not found|not found|does not exist|doesn't exist)"#,
        K::DanglingConnection,
        S::FixConnections,
        "Connections must reference existing node names",
    ),
    (
        r#"(?:missing|required) parameter:?\s*["'`]?([\w.]+)["'`]?(?:.*?node\s+["'`]([^"'`]+)["'`])?"#,
        K::MissingParameter,
        S::AddMissingParameter,
        "A node is missing a parameter its family requires",
    ),
    (
        r#"parameter\s+["'`]([\w.]+)["'`]\s+is required(?:.*?node\s+["'`]([^"'`]+)["'`])?"#,
        K::MissingParameter,
        S::AddMissingParameter,
        "A node is missing a parameter its family requires",
    ),
    (
        r#"(?:invalid|unsupported|unknown)\s+(?:node\s+)?type\s?version(?:.*?node\s+["'`]([^"'`]+)["'`])?"#,
        K::InvalidTypeVersion,
        S::FixTypeVersion,
        "Use a typeVersion supported by the engine for this node family",
    ),
    (
        r"(?:invalid|error in) expression|expression (?:syntax )?error|expressionerror|unexpected token",
        K::ExpressionSyntax,
        S::FixExpressions,
        "Expressions must use the ={{ ... }} form",
    ),
    (
        r#"credentials?\b.*?(?:not found|missing|invalid|does not exist|not set|could not be found)(?:.*?node\s+["'`]([^"'`]+)["'`])?|no credentials"#,
        K::CredentialError,
        S::StripCredentials,
        "Reference credentials that exist in the engine, or leave them unset",
    ),
    (
        r#"duplicate node name:?\s*["'`]?([^"'`]+?)["'`]?\s*$|node names? must be unique"#,
        K::DuplicateNodeName,
        S::RenameDuplicates,
        "Every node needs a unique name",
    ),
    (
        r"\b(?:401|403)\b|unauthori[sz]ed|forbidden|invalid api key|x-n8n-api-key",
        K::AuthenticationFailure,
        S::NoFix,
        "The engine rejected the API credentials; check the engine configuration",
    ),
    (
        r"timed? ?out|\beconn(?:refused|reset)\b|connection (?:refused|reset|closed)|network error|\b(?:429|502|503|504)\b|bad gateway|service unavailable|rate limit",
        K::Transport,
        S::Retry,
        "Transient failure talking to the engine; retry",
    ),
];

static DEFAULT_TABLE: Lazy<Vec<ErrorPattern>> = Lazy::new(|| {
    DEFAULT_PATTERNS
        .iter()
        .filter_map(|(pattern, kind, strategy, hint)| {
            ErrorPattern::new(pattern, *kind, *strategy, *hint).ok()
        })
        .collect()
});

/// First-match-wins classifier over an ordered pattern table
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    patterns: Vec<ErrorPattern>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorClassifier {
    /// Classifier with the built-in table
    pub fn new() -> Self {
        Self {
            patterns: DEFAULT_TABLE.clone(),
        }
    }

    /// Classifier with no rows; everything classifies as unknown
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Add a row ahead of the built-in ones
    pub fn with_priority_pattern(mut self, pattern: ErrorPattern) -> Self {
        self.patterns.insert(0, pattern);
        self
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn classify(&self, raw: &str) -> ErrorClassification {
        self.patterns
            .iter()
            .find_map(|pattern| pattern.classify(raw))
            .unwrap_or_else(ErrorClassification::unknown)
    }
}
