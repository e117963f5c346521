//! Repairs keyed on a classified engine error
//!
//! These run before the regular pipeline and only touch what the error
//! points at. Strategies that need no document change fall through.

use serde_json::{json, Map, Value};

use super::families::{slug, OPTIONS_FAMILIES};
use super::{node_name, node_names, nodes_mut, Document, FixContext};
use crate::domain::classifier::{ErrorClassification, FixStrategy};
use crate::domain::document::{expression, schema, NodeFamily};

/// Keys that are never removed by a property strip
const PROTECTED_KEYS: &[&str] = &[
    "id",
    "name",
    "nodes",
    "connections",
    "type",
    "typeVersion",
    "position",
    "parameters",
    "node",
    "index",
];

fn family_of(node: &Value) -> Option<NodeFamily> {
    node.get("type")
        .and_then(Value::as_str)
        .and_then(NodeFamily::resolve)
}

pub(super) fn apply(
    document: Document,
    classification: &ErrorClassification,
    context: &mut FixContext,
) -> Document {
    let capture = classification.capture(0);

    match classification.fix_strategy {
        FixStrategy::FixNodeType => match capture {
            Some(raw) => fix_node_type(document, raw, context),
            None => document,
        },
        FixStrategy::StripProperty => match capture {
            Some(key) => strip_property(document, key, context),
            None => document,
        },
        FixStrategy::EnsureEnvelope => match capture {
            Some(field) => ensure_field(document, field, context),
            None => document,
        },
        FixStrategy::FixConnections => match capture {
            Some(missing) => drop_references(document, missing, context),
            None => document,
        },
        FixStrategy::AddMissingParameter => match capture {
            Some(parameter) => add_parameter(document, parameter, classification.capture(1), context),
            None => document,
        },
        FixStrategy::FixTypeVersion => reset_type_versions(document, capture, context),
        FixStrategy::FixExpressions => repair_expressions(document, context),
        FixStrategy::StripCredentials => strip_credentials(document, capture, context),
        FixStrategy::ResetSettings => {
            let mut document = document;
            document.insert(
                "settings".to_string(),
                json!({"executionOrder": schema::EXECUTION_ORDER_V1}),
            );
            context.applied("Reset workflow settings");
            document
        }
        FixStrategy::RenameDuplicates
        | FixStrategy::Retry
        | FixStrategy::Regenerate
        | FixStrategy::NoFix => document,
    }
}

fn short_name(tag: &str) -> &str {
    tag.rsplit('.').next().unwrap_or(tag)
}

fn fix_node_type(mut document: Document, raw: &str, context: &mut FixContext) -> Document {
    let Some(family) = NodeFamily::resolve(raw) else {
        context.suggest(format!(
            "Node type '{}' is not available; replace it with a supported node",
            raw
        ));
        return document;
    };
    let canonical = family.type_tag();

    let Some(nodes) = nodes_mut(&mut document) else {
        return document;
    };

    for node in nodes.iter_mut() {
        let matches = node
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t.eq_ignore_ascii_case(raw) || short_name(t).eq_ignore_ascii_case(short_name(raw)));
        if !matches || node.get("type").and_then(Value::as_str) == Some(canonical) {
            continue;
        }

        if let Some(map) = node.as_object_mut() {
            map.insert("type".to_string(), json!(canonical));
            map.insert("typeVersion".to_string(), json!(family.default_type_version()));
        }
        let name = node_name(node).unwrap_or("node");
        context.applied(format!("Replaced node type '{}' with '{}' on node '{}'", raw, canonical, name));
    }

    document
}

fn strip_property(mut document: Document, key: &str, context: &mut FixContext) -> Document {
    if PROTECTED_KEYS.contains(&key) {
        return document;
    }

    let mut removed = document.remove(key).is_some() as usize;

    for section in ["settings", "meta"] {
        if let Some(map) = document.get_mut(section).and_then(Value::as_object_mut) {
            removed += map.remove(key).is_some() as usize;
        }
    }

    if let Some(nodes) = nodes_mut(&mut document) {
        for node in nodes.iter_mut().filter_map(Value::as_object_mut) {
            removed += node.remove(key).is_some() as usize;
        }
    }

    if removed > 0 {
        context.applied(format!("Removed property '{}' ({} occurrence(s))", key, removed));
    }
    document
}

fn ensure_field(mut document: Document, field: &str, context: &mut FixContext) -> Document {
    let default = match field {
        "name" => json!(schema::DEFAULT_WORKFLOW_NAME),
        "nodes" => json!([]),
        "connections" => json!({}),
        "settings" => json!({"executionOrder": schema::EXECUTION_ORDER_V1}),
        _ => return document,
    };

    if !document.contains_key(field) {
        document.insert(field.to_string(), default);
        context.applied(format!("Added missing '{}'", field));
    }
    document
}

fn drop_references(mut document: Document, missing: &str, context: &mut FixContext) -> Document {
    if node_names(&document).iter().any(|name| name == missing) {
        context.suggest(format!(
            "The engine could not resolve node '{}'; check its name and id",
            missing
        ));
        return document;
    }

    let Some(connections) = document.get_mut("connections").and_then(Value::as_object_mut) else {
        return document;
    };

    let mut removed = connections.remove(missing).is_some() as usize;

    for outputs in connections
        .values_mut()
        .filter_map(Value::as_object_mut)
        .flat_map(|ports| ports.values_mut())
        .filter_map(Value::as_array_mut)
        .flatten()
        .filter_map(Value::as_array_mut)
    {
        let before = outputs.len();
        outputs.retain(|entry| entry.get("node").and_then(Value::as_str) != Some(missing));
        removed += before - outputs.len();
    }

    if removed > 0 {
        context.applied(format!("Removed connections to missing node '{}'", missing));
    }
    document
}

/// Default for a required parameter, with the families that need it
fn parameter_default(parameter: &str, node_name: &str) -> Option<(Value, &'static [NodeFamily])> {
    let default = match parameter {
        "options" => (json!({}), OPTIONS_FAMILIES),
        "path" => (json!(slug(node_name)), &[NodeFamily::WebhookTrigger][..]),
        "httpMethod" => (json!("GET"), &[NodeFamily::WebhookTrigger][..]),
        "method" => (json!("GET"), &[NodeFamily::HttpRequest][..]),
        "rule" => (
            json!({"interval": [{"field": "days"}]}),
            &[NodeFamily::ScheduleTrigger][..],
        ),
        "conditions" => (
            json!({
                "options": {"caseSensitive": true, "leftValue": "", "typeValidation": "strict"},
                "conditions": [],
                "combinator": "and"
            }),
            &[NodeFamily::If, NodeFamily::Filter][..],
        ),
        "assignments" => (json!({"assignments": []}), &[NodeFamily::Set][..]),
        "rules" => (json!({"values": []}), &[NodeFamily::Switch][..]),
        "jsCode" => (json!("return $input.all();"), &[NodeFamily::Code][..]),
        _ => return None,
    };
    Some(default)
}

fn add_parameter(
    mut document: Document,
    parameter: &str,
    target: Option<&str>,
    context: &mut FixContext,
) -> Document {
    let Some(nodes) = nodes_mut(&mut document) else {
        return document;
    };

    let targeted = target.is_some_and(|t| nodes.iter().any(|n| node_name(n) == Some(t)));
    let mut added = Vec::new();

    for node in nodes.iter_mut() {
        let name = node_name(node).unwrap_or("node").to_string();
        let Some((default, families)) = parameter_default(parameter, &name) else {
            continue;
        };

        let selected = if targeted {
            target == Some(name.as_str())
        } else {
            family_of(node).is_some_and(|f| families.contains(&f))
        };
        if !selected {
            continue;
        }

        let Some(map) = node.as_object_mut() else {
            continue;
        };
        let params = map
            .entry("parameters")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(params) = params.as_object_mut() {
            if !params.contains_key(parameter) {
                params.insert(parameter.to_string(), default);
                added.push(name);
            }
        }
    }

    if added.is_empty() {
        context.suggest(match target {
            Some(node) => format!("Set parameter '{}' on node '{}'", parameter, node),
            None => format!("Set the required parameter '{}'", parameter),
        });
    }
    for name in added {
        context.applied(format!("Added parameter '{}' to node '{}'", parameter, name));
    }

    document
}

fn selected_nodes<'a>(
    nodes: &'a mut [Value],
    target: Option<&'a str>,
) -> impl Iterator<Item = &'a mut Value> + 'a {
    nodes
        .iter_mut()
        .filter(move |node| target.is_none_or(|t| node_name(node) == Some(t)))
}

/// Reset versions the engine is known to reject. An untargeted error only
/// touches nodes of known families that are missing a version or break an
/// exact-version requirement; unknown families are never rewritten.
fn reset_type_versions(mut document: Document, target: Option<&str>, context: &mut FixContext) -> Document {
    let Some(nodes) = nodes_mut(&mut document) else {
        return document;
    };

    for node in selected_nodes(nodes, target) {
        let Some(family) = family_of(node) else {
            continue;
        };
        let current = node.get("typeVersion").and_then(Value::as_f64);
        let version = family
            .exact_type_version()
            .unwrap_or_else(|| family.default_type_version());

        let reset = match (current, family.exact_type_version()) {
            (None, _) => true,
            (Some(actual), Some(required)) => actual != required,
            (Some(actual), None) => target.is_some() && actual != version,
        };
        if !reset {
            continue;
        }

        let name = node_name(node).unwrap_or("node").to_string();
        if let Some(map) = node.as_object_mut() {
            map.insert("typeVersion".to_string(), json!(version));
            context.applied(format!("Reset typeVersion to {} on node '{}'", version, name));
        }
    }

    document
}

/// Drop a stray expression marker and close unbalanced templates
fn repair_expression(value: &str) -> Option<String> {
    if let Some(rest) = value.strip_prefix('=') {
        if !expression::has_template(rest) {
            return Some(rest.to_string());
        }
    }

    let open = value.matches("{{").count();
    let close = value.matches("}}").count();
    (open > close).then(|| format!("{}{}", value, " }}".repeat(open - close)))
}

fn repair_strings(value: &mut Value, count: &mut usize) {
    match value {
        Value::String(s) => {
            if let Some(repaired) = repair_expression(s) {
                *s = repaired;
                *count += 1;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|item| repair_strings(item, count)),
        Value::Object(map) => map
            .iter_mut()
            .filter(|(key, _)| !expression::is_code_field(key))
            .for_each(|(_, child)| repair_strings(child, count)),
        _ => {}
    }
}

fn repair_expressions(mut document: Document, context: &mut FixContext) -> Document {
    let Some(nodes) = nodes_mut(&mut document) else {
        return document;
    };

    for node in nodes.iter_mut() {
        let name = node_name(node).unwrap_or("node").to_string();
        let mut count = 0;
        if let Some(params) = node.get_mut("parameters") {
            repair_strings(params, &mut count);
        }
        if count > 0 {
            context.applied(format!("Repaired {} expression(s) in node '{}'", count, name));
        }
    }

    document
}

fn strip_credentials(mut document: Document, target: Option<&str>, context: &mut FixContext) -> Document {
    let Some(nodes) = nodes_mut(&mut document) else {
        return document;
    };

    for node in selected_nodes(nodes, target) {
        let name = node_name(node).unwrap_or("node").to_string();
        if let Some(map) = node.as_object_mut() {
            if map.remove("credentials").is_some() {
                context.applied(format!("Removed credentials from node '{}'", name));
                context.suggest(format!("Attach valid credentials to node '{}' after import", name));
            }
        }
    }

    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::classifier::ErrorKind;

    fn classification(strategy: FixStrategy, captures: &[&str]) -> ErrorClassification {
        ErrorClassification::new(ErrorKind::Unknown, strategy, "")
            .with_captures(captures.iter().map(|c| c.to_string()).collect())
    }

    fn run(value: Value, strategy: FixStrategy, captures: &[&str]) -> (Value, FixContext) {
        let mut context = FixContext::default();
        let document = apply(
            value.as_object().cloned().unwrap(),
            &classification(strategy, captures),
            &mut context,
        );
        (Value::Object(document), context)
    }

    #[test]
    fn test_node_type_replaced() {
        let (value, context) = run(
            json!({"nodes": [{"name": "Inbox", "type": "gmailtrigger", "typeVersion": 9}]}),
            FixStrategy::FixNodeType,
            &["gmailtrigger"],
        );
        assert_eq!(value["nodes"][0]["type"], "n8n-nodes-base.gmailTrigger");
        assert_eq!(context.applied.len(), 1);
    }

    #[test]
    fn test_unknown_node_type_suggests() {
        let (value, context) = run(
            json!({"nodes": [{"name": "W", "type": "acme.widget"}]}),
            FixStrategy::FixNodeType,
            &["acme.widget"],
        );
        assert_eq!(value["nodes"][0]["type"], "acme.widget");
        assert_eq!(context.suggestions.len(), 1);
    }

    #[test]
    fn test_property_stripped_but_structure_protected() {
        let (value, _) = run(
            json!({"name": "W", "tags2": [], "nodes": [{"name": "A", "tags2": 1}], "settings": {"tags2": 1}}),
            FixStrategy::StripProperty,
            &["tags2"],
        );
        assert_eq!(value, json!({"name": "W", "nodes": [{"name": "A"}], "settings": {}}));

        let (value, _) = run(json!({"name": "W"}), FixStrategy::StripProperty, &["name"]);
        assert_eq!(value["name"], "W");
    }

    #[test]
    fn test_missing_node_references_dropped() {
        let (value, _) = run(
            json!({
                "nodes": [{"name": "A"}],
                "connections": {
                    "A": {"main": [[{"node": "Send Mail", "type": "main", "index": 0}]]},
                    "Send Mail": {"main": [[{"node": "A", "type": "main", "index": 0}]]}
                }
            }),
            FixStrategy::FixConnections,
            &["Send Mail"],
        );
        assert_eq!(value["connections"], json!({"A": {"main": [[]]}}));
    }

    #[test]
    fn test_missing_parameter_on_named_node() {
        let (value, _) = run(
            json!({"nodes": [
                {"name": "Fetch", "type": "n8n-nodes-base.httpRequest", "parameters": {}},
                {"name": "Other", "type": "n8n-nodes-base.httpRequest", "parameters": {}}
            ]}),
            FixStrategy::AddMissingParameter,
            &["method", "Fetch"],
        );
        assert_eq!(value["nodes"][0]["parameters"]["method"], "GET");
        assert!(value["nodes"][1]["parameters"].get("method").is_none());
    }

    #[test]
    fn test_missing_parameter_by_family() {
        let (value, _) = run(
            json!({"nodes": [
                {"name": "Incoming Orders", "type": "n8n-nodes-base.webhook", "parameters": {}},
                {"name": "Fetch", "type": "n8n-nodes-base.httpRequest", "parameters": {}}
            ]}),
            FixStrategy::AddMissingParameter,
            &["path"],
        );
        assert_eq!(value["nodes"][0]["parameters"]["path"], "incoming-orders");
        assert!(value["nodes"][1]["parameters"].get("path").is_none());
    }

    #[test]
    fn test_expression_repairs() {
        assert_eq!(repair_expression("=plain").as_deref(), Some("plain"));
        assert_eq!(repair_expression("={{ $json.a").as_deref(), Some("={{ $json.a }}"));
        assert_eq!(repair_expression("={{ $json.a }}"), None);
    }

    #[test]
    fn test_credentials_stripped_for_target() {
        let (value, context) = run(
            json!({"nodes": [
                {"name": "Slack", "credentials": {"slackApi": {"id": "1"}}},
                {"name": "Sheet", "credentials": {"googleApi": {"id": "2"}}}
            ]}),
            FixStrategy::StripCredentials,
            &["Slack"],
        );
        assert!(value["nodes"][0].get("credentials").is_none());
        assert!(value["nodes"][1].get("credentials").is_some());
        assert_eq!(context.suggestions.len(), 1);
    }

    #[test]
    fn test_settings_reset() {
        let (value, _) = run(
            json!({"settings": {"bogus": true}}),
            FixStrategy::ResetSettings,
            &[],
        );
        assert_eq!(value["settings"], json!({"executionOrder": "v1"}));
    }

    #[test]
    fn test_untargeted_type_version_reset_leaves_working_nodes_alone() {
        let (value, context) = run(
            json!({"nodes": [
                {"name": "Branch", "type": "n8n-nodes-base.if", "typeVersion": 1},
                {"name": "Post", "type": "n8n-nodes-base.slack", "typeVersion": 2.1},
                {"name": "Custom", "type": "n8n-nodes-acme.widget", "typeVersion": 3},
                {"name": "Wait", "type": "n8n-nodes-base.wait"}
            ]}),
            FixStrategy::FixTypeVersion,
            &[],
        );

        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes[0]["typeVersion"], json!(2.0));
        assert_eq!(nodes[1]["typeVersion"], json!(2.1));
        assert_eq!(nodes[2]["typeVersion"], json!(3));
        assert!(nodes[3]["typeVersion"].is_number());
        assert_eq!(context.applied.len(), 2);
    }

    #[test]
    fn test_targeted_type_version_reset_uses_family_default() {
        let (value, _) = run(
            json!({"nodes": [
                {"name": "Post", "type": "n8n-nodes-base.slack", "typeVersion": 9},
                {"name": "Other", "type": "n8n-nodes-base.slack", "typeVersion": 9},
                {"name": "Custom", "type": "n8n-nodes-acme.widget", "typeVersion": 9}
            ]}),
            FixStrategy::FixTypeVersion,
            &["Post"],
        );

        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes[0]["typeVersion"], json!(2.2));
        assert_eq!(nodes[1]["typeVersion"], json!(9));
        assert_eq!(nodes[2]["typeVersion"], json!(9));
    }
}
