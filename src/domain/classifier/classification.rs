//! Classification result types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a raw engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownNodeType,
    InvalidSettings,
    AdditionalProperty,
    MissingProperty,
    DanglingConnection,
    MissingParameter,
    InvalidTypeVersion,
    ExpressionSyntax,
    CredentialError,
    DuplicateNodeName,
    AuthenticationFailure,
    Transport,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownNodeType => "unknown_node_type",
            Self::InvalidSettings => "invalid_settings",
            Self::AdditionalProperty => "additional_property",
            Self::MissingProperty => "missing_property",
            Self::DanglingConnection => "dangling_connection",
            Self::MissingParameter => "missing_parameter",
            Self::InvalidTypeVersion => "invalid_type_version",
            Self::ExpressionSyntax => "expression_syntax",
            Self::CredentialError => "credential_error",
            Self::DuplicateNodeName => "duplicate_node_name",
            Self::AuthenticationFailure => "authentication_failure",
            Self::Transport => "transport",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic transform to apply for a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStrategy {
    FixNodeType,
    StripProperty,
    EnsureEnvelope,
    FixConnections,
    AddMissingParameter,
    FixTypeVersion,
    FixExpressions,
    StripCredentials,
    RenameDuplicates,
    ResetSettings,
    Retry,
    Regenerate,
    NoFix,
}

impl FixStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FixNodeType => "fix_node_type",
            Self::StripProperty => "strip_property",
            Self::EnsureEnvelope => "ensure_envelope",
            Self::FixConnections => "fix_connections",
            Self::AddMissingParameter => "add_missing_parameter",
            Self::FixTypeVersion => "fix_type_version",
            Self::FixExpressions => "fix_expressions",
            Self::StripCredentials => "strip_credentials",
            Self::RenameDuplicates => "rename_duplicates",
            Self::ResetSettings => "reset_settings",
            Self::Retry => "retry",
            Self::Regenerate => "regenerate",
            Self::NoFix => "no_fix",
        }
    }

    /// Whether the strategy changes the document at all
    pub fn is_targeted(&self) -> bool {
        !matches!(self, Self::Retry | Self::Regenerate | Self::NoFix)
    }
}

impl fmt::Display for FixStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying one raw error string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorClassification {
    pub kind: ErrorKind,
    pub fix_strategy: FixStrategy,
    /// Node or field names pulled out of the raw error
    pub captures: Vec<String>,
    pub hint: String,
}

impl ErrorClassification {
    pub fn new(kind: ErrorKind, fix_strategy: FixStrategy, hint: impl Into<String>) -> Self {
        Self {
            kind,
            fix_strategy,
            captures: Vec::new(),
            hint: hint.into(),
        }
    }

    pub fn with_captures(mut self, captures: Vec<String>) -> Self {
        self.captures = captures;
        self
    }

    pub fn unknown() -> Self {
        Self::new(
            ErrorKind::Unknown,
            FixStrategy::Regenerate,
            "Unrecognized engine error; regenerate the workflow with the error as context",
        )
    }

    pub fn capture(&self, index: usize) -> Option<&str> {
        self.captures.get(index).map(String::as_str)
    }
}
