//! Structural validator
//!
//! Runs, in order: schema check, structural check, logic check, optional
//! policy checks, scoring. Pure over its input; the result is rebuilt on
//! every call.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::complexity::ComplexityReport;
use super::options::ValidationOptions;
use super::result::{IssueKind, Severity, ValidationIssue, ValidationResult};
use super::rules;
use crate::domain::document::{
    expression, json_type_name, schema, ConnectionGraph, Node, NodeFamily, OutputConnections,
    WorkflowDocument,
};

const WARNING_PENALTY: u32 = 3;
const ERROR_HANDLING_BONUS: u32 = 5;
const EXECUTION_ORDER_BONUS: u32 = 3;
const BALANCED_COMPLEXITY_BONUS: u32 = 2;

/// Accumulates issues while the checks run
#[derive(Debug, Default)]
struct Findings {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
    suggestions: Vec<String>,
}

impl Findings {
    fn error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    fn warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    fn suggest(&mut self, suggestion: impl Into<String>) {
        let suggestion = suggestion.into();
        if !self.suggestions.contains(&suggestion) {
            self.suggestions.push(suggestion);
        }
    }
}

/// Rule-based checker for workflow documents
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate any JSON value; never fails
    pub fn validate(&self, input: &Value, options: &ValidationOptions) -> ValidationResult {
        let (document, nodes) = match check_schema(input) {
            Ok(checked) => checked,
            Err(issue) => return ValidationResult::rejected(issue),
        };

        let graph = ConnectionGraph::from_document(&document);
        let mut findings = Findings::default();

        check_envelope(&document, &mut findings);
        check_nodes(&document, &nodes, &mut findings);
        check_connections(&document, &nodes, &graph, &mut findings);
        check_logic(&nodes, &graph, &mut findings);

        let complexity = ComplexityReport::assess(&document, &graph);
        check_policy(&nodes, &complexity, options, &mut findings);

        let score = score(&document, &nodes, &complexity, &findings);

        ValidationResult {
            is_valid: findings.errors.is_empty(),
            errors: findings.errors,
            warnings: findings.warnings,
            suggestions: findings.suggestions,
            score,
        }
    }

    pub fn validate_document(
        &self,
        document: &WorkflowDocument,
        options: &ValidationOptions,
    ) -> ValidationResult {
        self.validate(&document.to_value(), options)
    }
}

fn critical(kind: IssueKind, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue::new(kind, Severity::Critical, message)
}

fn check_schema(input: &Value) -> Result<(WorkflowDocument, Vec<Node>), ValidationIssue> {
    let Value::Object(map) = input else {
        return Err(critical(
            IssueKind::InvalidDocument,
            format!("Workflow must be a JSON object, got {}", json_type_name(input)),
        ));
    };

    if let Some(field) = schema::REQUIRED_TOP_LEVEL_FIELDS
        .iter()
        .find(|field| !map.contains_key(**field))
    {
        return Err(critical(
            IssueKind::MissingField,
            format!("Missing required field '{}'", field),
        )
        .at(*field));
    }

    let raw_nodes = match map.get("nodes") {
        Some(Value::Array(nodes)) if !nodes.is_empty() => nodes,
        Some(Value::Array(_)) => {
            return Err(critical(IssueKind::EmptyNodes, "Workflow has no nodes").at("nodes"));
        }
        Some(other) => {
            return Err(critical(
                IssueKind::EmptyNodes,
                format!("'nodes' must be an array, got {}", json_type_name(other)),
            )
            .at("nodes"));
        }
        None => {
            return Err(
                critical(IssueKind::MissingField, "Missing required field 'nodes'").at("nodes")
            );
        }
    };

    let mut nodes = Vec::with_capacity(raw_nodes.len());

    for (index, raw) in raw_nodes.iter().enumerate() {
        match Node::from_value(raw) {
            Ok(node) => nodes.push(node),
            Err(e) => {
                return Err(critical(IssueKind::InvalidNode, format!("Node {}: {}", index, e))
                    .at(format!("nodes[{}]", index)));
            }
        }
    }

    if !map.get("connections").is_some_and(Value::is_object) {
        return Err(critical(
            IssueKind::InvalidConnections,
            "'connections' must be an object keyed by source node name",
        )
        .at("connections"));
    }

    Ok((WorkflowDocument::new(map.clone()), nodes))
}

fn check_envelope(document: &WorkflowDocument, findings: &mut Findings) {
    for key in document.as_map().keys() {
        if !schema::is_top_level_field(key) {
            findings.warning(
                ValidationIssue::new(
                    IssueKind::UnknownField,
                    Severity::Low,
                    format!("Top-level field '{}' is not part of the workflow schema", key),
                )
                .at(key.as_str()),
            );
        }
    }

    match document.get("settings") {
        None => {}
        Some(Value::Object(settings)) => {
            for key in settings.keys().filter(|k| !schema::is_settings_field(k)) {
                findings.warning(
                    ValidationIssue::new(
                        IssueKind::UnknownSetting,
                        Severity::Low,
                        format!("Setting '{}' is not recognized by the engine", key),
                    )
                    .at(format!("settings.{}", key)),
                );
            }
        }
        Some(other) => findings.warning(
            ValidationIssue::new(
                IssueKind::UnknownSetting,
                Severity::Medium,
                format!("'settings' must be an object, got {}", json_type_name(other)),
            )
            .at("settings"),
        ),
    }
}

fn check_nodes(document: &WorkflowDocument, nodes: &[Node], findings: &mut Findings) {
    let mut seen_names: HashSet<&str> = HashSet::new();
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for (index, (node, raw)) in nodes.iter().zip(document.raw_nodes()).enumerate() {
        let location = format!("nodes[{}]", index);

        if !seen_names.insert(node.name.as_str()) {
            findings.error(
                ValidationIssue::new(
                    IssueKind::DuplicateNodeName,
                    Severity::High,
                    format!("Node name '{}' is used more than once", node.name),
                )
                .at(location.as_str()),
            );
        }

        if !seen_ids.insert(node.id.as_str()) {
            findings.warning(
                ValidationIssue::new(
                    IssueKind::DuplicateNodeId,
                    Severity::Medium,
                    format!("Node id '{}' is used more than once", node.id),
                )
                .at(location.as_str()),
            );
        }

        if node.position.is_none() {
            findings.warning(
                ValidationIssue::new(
                    IssueKind::InvalidPosition,
                    Severity::Low,
                    format!("Node '{}' has a missing or malformed position", node.name),
                )
                .at(format!("{}.position", location)),
            );
        }

        check_node_type(node, &location, findings);
        check_node_fields(node, raw, &location, findings);

        for issue in rules::check_parameters(node, &location) {
            let blocking = issue.severity >= Severity::Medium
                && issue.kind != IssueKind::LegacyParameters;
            if blocking {
                findings.error(issue);
            } else {
                findings.warning(issue);
            }
        }

        if node.family().is_some_and(|f| f.requires_credentials()) && node.credentials.is_none() {
            findings.warning(
                ValidationIssue::new(
                    IssueKind::MissingCredentials,
                    Severity::Low,
                    format!("Node '{}' calls a third-party service without credentials", node.name),
                )
                .at(format!("{}.credentials", location)),
            );
        }
    }
}

fn check_node_type(node: &Node, location: &str, findings: &mut Findings) {
    let Some(family) = node.family() else {
        findings.warning(
            ValidationIssue::new(
                IssueKind::UnknownNodeType,
                Severity::Medium,
                format!("Node '{}' has unrecognized type '{}'", node.name, node.node_type),
            )
            .at(format!("{}.type", location)),
        );
        return;
    };

    if !node.node_type.is_canonical() {
        findings.warning(
            ValidationIssue::new(
                IssueKind::NonCanonicalNodeType,
                Severity::Low,
                format!(
                    "Node '{}' type '{}' should be spelled '{}'",
                    node.name,
                    node.node_type,
                    family.type_tag()
                ),
            )
            .at(format!("{}.type", location)),
        );
    }

    match (node.type_version, family.exact_type_version()) {
        (None, _) => findings.warning(
            ValidationIssue::new(
                IssueKind::InvalidTypeVersion,
                Severity::Low,
                format!("Node '{}' has no typeVersion", node.name),
            )
            .at(format!("{}.typeVersion", location)),
        ),
        (Some(actual), Some(required)) if actual != required => findings.warning(
            ValidationIssue::new(
                IssueKind::InvalidTypeVersion,
                Severity::Medium,
                format!(
                    "Node '{}' must use typeVersion {} (found {})",
                    node.name, required, actual
                ),
            )
            .at(format!("{}.typeVersion", location)),
        ),
        _ => {}
    }
}

fn check_node_fields(node: &Node, raw: &Value, location: &str, findings: &mut Findings) {
    let Some(map) = raw.as_object() else {
        return;
    };

    for key in map.keys().filter(|k| !schema::is_node_field(k)) {
        findings.warning(
            ValidationIssue::new(
                IssueKind::UnknownField,
                Severity::Low,
                format!("Node '{}' has non-standard field '{}'", node.name, key),
            )
            .at(format!("{}.{}", location, key)),
        );
    }

    if let Some(params) = map.get("parameters").and_then(Value::as_object) {
        let mut path = format!("{}.parameters", location);
        scan_parameters(node, params, &mut path, findings);
    }
}

/// Walk a parameter bag looking for reserved keys and legacy expressions
fn scan_parameters(
    node: &Node,
    params: &Map<String, Value>,
    path: &mut String,
    findings: &mut Findings,
) {
    for (key, value) in params {
        let len = path.len();
        path.push('.');
        path.push_str(key);

        if !schema::is_allowed_parameter_key(node.family(), key) {
            findings.warning(
                ValidationIssue::new(
                    IssueKind::UnknownField,
                    Severity::Low,
                    format!("Node '{}' parameter '{}' uses a reserved name", node.name, key),
                )
                .at(path.as_str()),
            );
        }

        if !expression::is_code_field(key) {
            scan_value(node, value, path, findings);
        }

        path.truncate(len);
    }
}

fn scan_value(node: &Node, value: &Value, path: &mut String, findings: &mut Findings) {
    match value {
        Value::String(s) if expression::is_legacy(s) => findings.warning(
            ValidationIssue::new(
                IssueKind::LegacyExpression,
                Severity::Low,
                format!("Node '{}' uses a non-canonical expression", node.name),
            )
            .at(path.as_str()),
        ),
        Value::Object(map) => scan_parameters(node, map, path, findings),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("[{}]", index));
                scan_value(node, item, path, findings);
                path.truncate(len);
            }
        }
        _ => {}
    }
}

fn check_connections(
    document: &WorkflowDocument,
    nodes: &[Node],
    graph: &ConnectionGraph,
    findings: &mut Findings,
) {
    let names: HashSet<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
    let ids: HashMap<&str, &str> = nodes
        .iter()
        .map(|n| (n.id.as_str(), n.name.as_str()))
        .collect();

    if let Some(connections) = document.raw_connections() {
        for (source, outputs) in connections {
            let location = format!("connections.{}", source);

            if !names.contains(source.as_str()) {
                let message = match ids.get(source.as_str()) {
                    Some(name) => format!(
                        "Connection source '{}' is a node id; connections are keyed by name ('{}')",
                        source, name
                    ),
                    None => format!("Connection source '{}' does not match any node", source),
                };
                findings.error(
                    ValidationIssue::new(IssueKind::DanglingConnection, Severity::High, message)
                        .at(location.as_str()),
                );
            }

            match OutputConnections::from_value(outputs) {
                Ok(parsed) => {
                    for port in parsed.ports.keys().filter(|p| !schema::is_port_type(p)) {
                        findings.warning(
                            ValidationIssue::new(
                                IssueKind::MalformedConnection,
                                Severity::Low,
                                format!("Connection port type '{}' is not recognized", port),
                            )
                            .at(format!("{}.{}", location, port)),
                        );
                    }
                }
                Err(reason) => findings.warning(
                    ValidationIssue::new(
                        IssueKind::MalformedConnection,
                        Severity::Medium,
                        format!("Connections from '{}' are malformed: {}", source, reason),
                    )
                    .at(location.as_str()),
                ),
            }
        }
    }

    for edge in graph.edges() {
        if !names.contains(edge.target.as_str()) {
            findings.error(
                ValidationIssue::new(
                    IssueKind::DanglingConnection,
                    Severity::High,
                    format!(
                        "Connection from '{}' targets missing node '{}'",
                        edge.source, edge.target
                    ),
                )
                .at(format!("connections.{}", edge.source)),
            );
        }
    }

    let graph_nodes: Vec<&Node> = nodes
        .iter()
        .filter(|n| !n.family().is_some_and(|f| f.is_annotation()))
        .collect();

    if graph_nodes.len() > 1 {
        let connected = graph.connected_names();

        for node in graph_nodes {
            if !connected.contains(node.name.as_str()) {
                findings.warning(ValidationIssue::new(
                    IssueKind::OrphanedNode,
                    Severity::Low,
                    format!("Node '{}' is not connected to any other node", node.name),
                ));
            }
        }
    }
}

fn check_logic(nodes: &[Node], graph: &ConnectionGraph, findings: &mut Findings) {
    let triggers = nodes.iter().filter(|n| n.is_trigger()).count();

    match triggers {
        0 => findings.warning(ValidationIssue::new(
            IssueKind::NoTrigger,
            Severity::Medium,
            "Workflow has no trigger node and can only be started manually",
        )),
        1 => {}
        n => findings.suggest(format!(
            "Workflow has {} trigger nodes; most workflows expect exactly one",
            n
        )),
    }

    let loop_names: HashSet<&str> = nodes
        .iter()
        .filter(|n| n.family().is_some_and(|f| f.is_loop()))
        .map(|n| n.name.as_str())
        .collect();

    if let Some(cycle) = graph.find_cycle(|name| loop_names.contains(name)) {
        findings.warning(ValidationIssue::new(
            IssueKind::CycleDetected,
            Severity::Medium,
            format!("Connection cycle detected: {}", cycle.join(" -> ")),
        ));
    }

    for node in nodes.iter().filter(|n| n.family() == Some(NodeFamily::If)) {
        let outgoing: Vec<_> = graph.outgoing(&node.name).collect();
        if !outgoing.is_empty() && outgoing.iter().all(|edge| edge.output_index == 0) {
            findings.suggest(format!(
                "Conditional '{}' only uses its true branch; a Filter node would be simpler",
                node.name
            ));
        }
    }
}

fn check_policy(
    nodes: &[Node],
    complexity: &ComplexityReport,
    options: &ValidationOptions,
    findings: &mut Findings,
) {
    if options.require_error_handling && !nodes.iter().any(Node::has_error_handling) {
        findings.warning(ValidationIssue::new(
            IssueKind::NoErrorHandling,
            Severity::Medium,
            "No node declares failure handling (onError / continueOnFail)",
        ));
    }

    for family in &options.required_families {
        if !nodes.iter().any(|n| n.family() == Some(*family)) {
            findings.error(ValidationIssue::new(
                IssueKind::MissingRequiredNode,
                Severity::High,
                format!("Workflow must contain a '{}' node", family.type_tag()),
            ));
        }
    }

    if let Some(target) = options.target_complexity {
        if complexity.level != target {
            findings.warning(ValidationIssue::new(
                IssueKind::ComplexityMismatch,
                Severity::Low,
                format!(
                    "Workflow complexity is {:?} (score {}), expected {:?}",
                    complexity.level, complexity.score, target
                ),
            ));
        }
    }
}

fn score(
    document: &WorkflowDocument,
    nodes: &[Node],
    complexity: &ComplexityReport,
    findings: &Findings,
) -> u8 {
    let penalty: u32 = findings
        .errors
        .iter()
        .map(|issue| issue.severity.penalty())
        .sum::<u32>()
        + WARNING_PENALTY * findings.warnings.len() as u32;

    let mut bonus = 0;

    if nodes.iter().any(Node::has_error_handling) {
        bonus += ERROR_HANDLING_BONUS;
    }

    let execution_order = document
        .settings()
        .and_then(|s| s.get("executionOrder"))
        .and_then(Value::as_str);
    if execution_order == Some(schema::EXECUTION_ORDER_V1) {
        bonus += EXECUTION_ORDER_BONUS;
    }

    if complexity.is_balanced() {
        bonus += BALANCED_COMPLEXITY_BONUS;
    }

    let score = (100 + bonus).saturating_sub(penalty).min(100);
    score as u8
}
