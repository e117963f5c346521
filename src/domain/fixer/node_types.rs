//! Node type tag normalization

use serde_json::{json, Value};

use super::{nodes_mut, Document, FixContext};
use crate::domain::document::NodeFamily;

fn short_name(tag: &str) -> &str {
    tag.rsplit('.').next().unwrap_or(tag)
}

/// Rewrite one node's type tag to its canonical spelling.
/// Returns the old tag when it changed.
pub(super) fn normalize_node_type(node: &mut Value) -> Option<String> {
    let raw = node.get("type").and_then(Value::as_str)?.to_string();
    let family = NodeFamily::resolve(&raw)?;
    let canonical = family.type_tag();

    if raw == canonical {
        return None;
    }

    let map = node.as_object_mut()?;
    map.insert("type".to_string(), json!(canonical));

    // Legacy aliases (cron, function, start) carry versions of a different node
    if !short_name(&raw).eq_ignore_ascii_case(short_name(canonical)) {
        map.insert("typeVersion".to_string(), json!(family.default_type_version()));
    }

    Some(raw)
}

pub(super) fn normalize_node_types(mut document: Document, context: &mut FixContext) -> Document {
    let Some(nodes) = nodes_mut(&mut document) else {
        return document;
    };

    for node in nodes.iter_mut() {
        if let Some(old) = normalize_node_type(node) {
            let new = node.get("type").and_then(Value::as_str).unwrap_or_default();
            context.applied(format!("Normalized node type '{}' to '{}'", old, new));
        }
    }

    document
}
