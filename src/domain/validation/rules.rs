//! Family-specific parameter checks

use once_cell::sync::Lazy;
use regex::Regex;

use super::result::{IssueKind, Severity, ValidationIssue};
use crate::domain::document::{MessagingPlatform, Node, NodeFamily, NodeParameters};

static SLACK_CHANNEL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?[a-z0-9][a-z0-9._-]{0,79}$").unwrap());
static SLACK_CHANNEL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[CGDU][A-Z0-9]{6,}$").unwrap());
static SLACK_USER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@[\w.-]+$").unwrap());
static TELEGRAM_CHAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?\d+|@[A-Za-z][A-Za-z0-9_]{4,})$").unwrap());
static DISCORD_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{17,20}$").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s,]+@[^@\s,]+\.[^@\s,]+$").unwrap());

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];
const WEBHOOK_RESPONSE_MODES: &[&str] = &["onReceived", "lastNode", "responseNode"];
const RESPOND_WITH: &[&str] = &[
    "allIncomingItems",
    "firstIncomingItem",
    "json",
    "text",
    "binary",
    "noData",
    "redirect",
    "jwt",
];

/// Values computed at runtime are not checked against addressing rules
pub fn is_expression(value: &str) -> bool {
    value.starts_with('=') || value.contains("{{")
}

/// Whether a messaging target follows the platform's addressing convention
pub fn is_valid_target(platform: MessagingPlatform, target: &str) -> bool {
    let target = target.trim();

    if is_expression(target) {
        return true;
    }

    match platform {
        MessagingPlatform::Slack => {
            SLACK_CHANNEL_NAME.is_match(target)
                || SLACK_CHANNEL_ID.is_match(target)
                || SLACK_USER.is_match(target)
        }
        MessagingPlatform::Telegram => TELEGRAM_CHAT.is_match(target),
        MessagingPlatform::Discord => DISCORD_ID.is_match(target),
        MessagingPlatform::Email => target
            .split(',')
            .map(str::trim)
            .all(|address| EMAIL.is_match(address)),
    }
}

/// Check a node's parameters against its family's shape
pub fn check_parameters(node: &Node, location: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let name = &node.name;

    let mut push = |kind: IssueKind, severity: Severity, message: String| {
        issues.push(ValidationIssue::new(kind, severity, message).at(location));
    };

    match &node.parameters {
        NodeParameters::Conditional(params) => {
            if params.conditions.is_empty() {
                push(
                    IssueKind::InvalidParameters,
                    Severity::Medium,
                    format!("Conditional node '{}' has an empty condition list", name),
                );
            }
            if params.legacy_shape {
                push(
                    IssueKind::LegacyParameters,
                    Severity::Low,
                    format!("Conditional node '{}' uses the legacy condition format", name),
                );
            }
        }
        NodeParameters::Switch(params) => {
            let expression_mode = params.mode.as_deref() == Some("expression");
            if !expression_mode && params.rules.is_empty() {
                push(
                    IssueKind::InvalidParameters,
                    Severity::Medium,
                    format!("Switch node '{}' has no routing rules", name),
                );
            }
        }
        NodeParameters::Set(params) => {
            if params.legacy_values {
                push(
                    IssueKind::LegacyParameters,
                    Severity::Low,
                    format!("Set node '{}' uses the legacy 'values' format", name),
                );
            }
        }
        NodeParameters::Code(params) => {
            if params.code.as_deref().is_none_or(|code| code.trim().is_empty()) {
                push(
                    IssueKind::InvalidParameters,
                    Severity::Low,
                    format!("Code node '{}' has no code", name),
                );
            }
        }
        NodeParameters::Http(params) => {
            if params.url.as_deref().is_none_or(|url| url.trim().is_empty()) {
                push(
                    IssueKind::InvalidParameters,
                    Severity::High,
                    format!("HTTP node '{}' has no URL", name),
                );
            }
            if let Some(method) = params.method.as_deref() {
                if !HTTP_METHODS.contains(&method) && !is_expression(method) {
                    push(
                        IssueKind::InvalidParameters,
                        Severity::Medium,
                        format!("HTTP node '{}' uses unsupported method '{}'", name, method),
                    );
                }
            }
        }
        NodeParameters::Messaging(params) => match params.target.as_deref() {
            None => push(
                IssueKind::InvalidParameters,
                Severity::Medium,
                format!("Messaging node '{}' has no recipient or channel", name),
            ),
            Some(target) if !is_valid_target(params.platform, target) => push(
                IssueKind::InvalidChannel,
                Severity::Medium,
                format!(
                    "Messaging node '{}' target '{}' does not follow the {:?} addressing convention",
                    name, target, params.platform
                ),
            ),
            Some(_) => {}
        },
        NodeParameters::Spreadsheet(params) => {
            if params.document.is_none() {
                push(
                    IssueKind::InvalidParameters,
                    Severity::Medium,
                    format!("Spreadsheet node '{}' does not reference a document", name),
                );
            }
        }
        NodeParameters::Schedule(params) => {
            if params.intervals.is_empty() {
                push(
                    IssueKind::InvalidParameters,
                    Severity::Low,
                    format!("Schedule trigger '{}' has no interval rule", name),
                );
            }
        }
        NodeParameters::Webhook(params) => {
            if params.path.as_deref().is_none_or(|path| path.trim().is_empty()) {
                push(
                    IssueKind::InvalidParameters,
                    Severity::Low,
                    format!("Webhook '{}' has no path", name),
                );
            }
            if let Some(method) = params.http_method.as_deref() {
                if !HTTP_METHODS.contains(&method) {
                    push(
                        IssueKind::InvalidParameters,
                        Severity::Medium,
                        format!("Webhook '{}' uses unsupported method '{}'", name, method),
                    );
                }
            }
            if let Some(mode) = params.response_mode.as_deref() {
                if !WEBHOOK_RESPONSE_MODES.contains(&mode) {
                    push(
                        IssueKind::InvalidParameters,
                        Severity::Low,
                        format!("Webhook '{}' has unknown response mode '{}'", name, mode),
                    );
                }
            }
        }
        NodeParameters::Ai(params) => {
            let needs_model = matches!(
                node.family(),
                Some(NodeFamily::OpenAi) | Some(NodeFamily::LmChatOpenAi)
            );
            if needs_model && params.model.is_none() {
                push(
                    IssueKind::InvalidParameters,
                    Severity::Low,
                    format!("AI node '{}' does not select a model", name),
                );
            }
        }
        NodeParameters::Response(params) => {
            if let Some(mode) = params.respond_with.as_deref() {
                if !RESPOND_WITH.contains(&mode) {
                    push(
                        IssueKind::InvalidParameters,
                        Severity::Low,
                        format!("Response node '{}' has unknown respondWith '{}'", name, mode),
                    );
                }
            }
        }
        NodeParameters::Other { .. } | NodeParameters::Unknown(_) => {}
    }

    issues
}
