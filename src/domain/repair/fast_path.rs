//! Trivially-simple document heuristic
//!
//! Documents this predicate accepts skip conformance testing. There is no
//! proof that such documents import cleanly; the check is a shortcut and can
//! be disabled through `repair.fast_path_enabled`.

use serde_json::Value;

use crate::domain::document::{expression, NodeFamily, WorkflowDocument};

const MAX_SIMPLE_NODES: usize = 3;

fn is_complex_family(family: NodeFamily) -> bool {
    family.is_branching() || family.is_loop() || matches!(family, NodeFamily::Code | NodeFamily::Merge)
}

fn has_template(value: &Value) -> bool {
    match value {
        Value::String(s) => expression::has_template(s),
        Value::Array(items) => items.iter().any(has_template),
        Value::Object(map) => map.values().any(has_template),
        _ => false,
    }
}

/// Small, linear, expression-free documents built only from known families
pub fn is_trivially_simple(document: &WorkflowDocument) -> bool {
    let nodes = document.raw_nodes();
    if nodes.is_empty() || nodes.len() > MAX_SIMPLE_NODES {
        return false;
    }

    nodes.iter().all(|node| {
        let family = node
            .get("type")
            .and_then(Value::as_str)
            .and_then(NodeFamily::resolve);

        family.is_some_and(|f| !is_complex_family(f))
            && !node.get("parameters").is_some_and(has_template)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(nodes: Value) -> WorkflowDocument {
        WorkflowDocument::from_value(json!({"name": "W", "nodes": nodes, "connections": {}})).unwrap()
    }

    #[test]
    fn test_small_linear_document_is_simple() {
        assert!(is_trivially_simple(&document(json!([
            {"name": "Start", "type": "n8n-nodes-base.manualTrigger", "parameters": {}},
            {"name": "Set", "type": "n8n-nodes-base.set", "parameters": {"value": "static"}}
        ]))));
    }

    #[test]
    fn test_branching_templates_and_size_disqualify() {
        assert!(!is_trivially_simple(&document(json!([
            {"name": "If", "type": "n8n-nodes-base.if", "parameters": {}}
        ]))));
        assert!(!is_trivially_simple(&document(json!([
            {"name": "Set", "type": "n8n-nodes-base.set", "parameters": {"v": "={{ $json.a }}"}}
        ]))));
        assert!(!is_trivially_simple(&document(json!([
            {"name": "A", "type": "n8n-nodes-base.set"},
            {"name": "B", "type": "n8n-nodes-base.set"},
            {"name": "C", "type": "n8n-nodes-base.set"},
            {"name": "D", "type": "n8n-nodes-base.set"}
        ]))));
        assert!(!is_trivially_simple(&document(json!([]))));
    }

    #[test]
    fn test_unknown_family_is_not_simple() {
        assert!(!is_trivially_simple(&document(json!([
            {"name": "W", "type": "acme.widget", "parameters": {}}
        ]))));
    }
}
