//! Allow-list enforcement

use serde_json::{Map, Value};

use super::{node_name, nodes_mut, Document, FixContext};
use crate::domain::document::{schema, NodeFamily};

/// Remove generator metadata keys anywhere under `value`, honouring the
/// family's exception list. Returns the cleaned value and the removal count.
pub fn strip_reserved_keys(value: Value, family: Option<NodeFamily>) -> (Value, usize) {
    let mut removed = 0;
    let value = strip(value, family, &mut removed);
    (value, removed)
}

fn strip(value: Value, family: Option<NodeFamily>, removed: &mut usize) -> Value {
    match value {
        Value::Object(map) => {
            let mut kept = Map::with_capacity(map.len());
            for (key, child) in map {
                if schema::is_allowed_parameter_key(family, &key) {
                    kept.insert(key, strip(child, family, removed));
                } else {
                    *removed += 1;
                }
            }
            Value::Object(kept)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| strip(item, family, removed))
                .collect(),
        ),
        other => other,
    }
}

/// Drop keys outside `allowed`, returning what was removed
fn retain_fields(map: &mut Map<String, Value>, allowed: fn(&str) -> bool) -> Vec<String> {
    let removed: Vec<String> = map.keys().filter(|key| !allowed(key)).cloned().collect();
    for key in &removed {
        map.remove(key);
    }
    removed
}

fn strip_field(map: &mut Map<String, Value>, key: &str, family: Option<NodeFamily>) -> usize {
    let Some(value) = map.get_mut(key) else {
        return 0;
    };
    let (cleaned, removed) = strip_reserved_keys(value.take(), family);
    *value = cleaned;
    removed
}

pub(super) fn strip_unknown_fields(mut document: Document, context: &mut FixContext) -> Document {
    for key in retain_fields(&mut document, schema::is_top_level_field) {
        context.applied(format!("Removed top-level field '{}'", key));
    }

    for key in ["staticData", "pinData"] {
        let removed = strip_field(&mut document, key, None);
        if removed > 0 {
            context.applied(format!("Removed {} reserved key(s) from {}", removed, key));
        }
    }

    for (key, allowed) in [
        ("settings", schema::is_settings_field as fn(&str) -> bool),
        ("meta", schema::is_meta_field),
    ] {
        if let Some(map) = document.get_mut(key).and_then(Value::as_object_mut) {
            for field in retain_fields(map, allowed) {
                context.applied(format!("Removed {} field '{}'", key, field));
            }
        }
    }

    if let Some(nodes) = nodes_mut(&mut document) {
        for node in nodes.iter_mut() {
            let name = node_name(node).unwrap_or("node").to_string();
            let family = node
                .get("type")
                .and_then(Value::as_str)
                .and_then(NodeFamily::resolve);
            let Some(node) = node.as_object_mut() else {
                continue;
            };

            for field in retain_fields(node, schema::is_node_field) {
                context.applied(format!("Removed field '{}' from node '{}'", field, name));
            }

            let removed = strip_field(node, "parameters", family) + strip_field(node, "credentials", None);
            if removed > 0 {
                context.applied(format!("Removed {} reserved key(s) from node '{}'", removed, name));
            }
        }
    }

    if let Some(connections) = document.get_mut("connections").and_then(Value::as_object_mut) {
        let mut removed = 0;
        for entry in connections
            .values_mut()
            .filter_map(Value::as_object_mut)
            .flat_map(|ports| ports.values_mut())
            .filter_map(Value::as_array_mut)
            .flatten()
            .filter_map(Value::as_array_mut)
            .flatten()
            .filter_map(Value::as_object_mut)
        {
            removed += retain_fields(entry, schema::is_connection_field).len();
        }
        if removed > 0 {
            context.applied(format!("Removed {} unknown connection field(s)", removed));
        }
    }

    document
}
