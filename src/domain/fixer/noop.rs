//! Pass-through node removal

use std::collections::HashMap;

use serde_json::Value;

use super::{node_name, Document, FixContext};
use crate::domain::document::NodeFamily;

fn is_noop(node: &Value) -> bool {
    node.get("type")
        .and_then(Value::as_str)
        .and_then(NodeFamily::resolve)
        == Some(NodeFamily::NoOp)
}

/// Target name of a connection entry, for object and bare-string entries
fn entry_target(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(name) => Some(name),
        Value::Object(map) => map.get("node").and_then(Value::as_str),
        _ => None,
    }
}

/// Leaf connection entries anywhere under `value`
fn collect_entries(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_entries(item, out)),
        Value::Object(map) if map.contains_key("node") => out.push(value.clone()),
        Value::Object(map) => map.values().for_each(|v| collect_entries(v, out)),
        Value::String(_) => out.push(value.clone()),
        _ => {}
    }
}

/// Replace every entry pointing at `name` with `replacement`, in place in each list
fn replace_references(value: Value, name: &str, replacement: &[Value]) -> Value {
    match value {
        Value::Array(items) => {
            let mut rebuilt: Vec<Value> = Vec::with_capacity(items.len());

            for item in items {
                if entry_target(&item) == Some(name) {
                    for entry in replacement {
                        if !rebuilt.contains(entry) {
                            rebuilt.push(entry.clone());
                        }
                    }
                } else {
                    let item = replace_references(item, name, replacement);
                    if !rebuilt.contains(&item) || item.is_array() {
                        rebuilt.push(item);
                    }
                }
            }

            Value::Array(rebuilt)
        }
        Value::Object(map) if !map.contains_key("node") => Value::Object(
            map.into_iter()
                .map(|(key, child)| (key, replace_references(child, name, replacement)))
                .collect(),
        ),
        other => other,
    }
}

/// Remove no-op nodes, wiring their upstream sources straight to their targets
///
/// Connections are keyed by name, so a no-op sharing its name with another
/// node cannot be told apart from it. Such no-ops are kept and left for the
/// duplicate-name pass.
pub(super) fn remove_noop_nodes(mut document: Document, context: &mut FixContext) -> Document {
    let Some(nodes) = document.get("nodes").and_then(Value::as_array) else {
        return document;
    };

    let noop_count = nodes.iter().filter(|node| is_noop(node)).count();

    // Documents made only of no-ops are left intact
    if noop_count == 0 || noop_count == nodes.len() {
        return document;
    }

    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for name in nodes.iter().filter_map(node_name) {
        *name_counts.entry(name).or_default() += 1;
    }

    let removable: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| is_noop(node))
        .filter(|(_, node)| node_name(node).is_some_and(|name| name_counts.get(name) == Some(&1)))
        .map(|(index, _)| index)
        .collect();

    let spliced: Vec<String> = removable
        .iter()
        .filter_map(|&index| node_name(&nodes[index]))
        .map(str::to_string)
        .collect();

    for name in &spliced {
        splice(&mut document, name);
        context.applied(format!("Removed no-op node '{}'", name));
    }

    if let Some(nodes) = document.get_mut("nodes").and_then(Value::as_array_mut) {
        let mut index = 0;
        nodes.retain(|_| {
            let keep = !removable.contains(&index);
            index += 1;
            keep
        });
    }

    document
}

fn splice(document: &mut Document, name: &str) {
    let Some(connections) = document.get_mut("connections").and_then(Value::as_object_mut) else {
        return;
    };

    let mut downstream = Vec::new();
    if let Some(outputs) = connections.remove(name) {
        collect_entries(&outputs, &mut downstream);
    }
    downstream.retain(|entry| entry_target(entry) != Some(name));

    let sources: Vec<String> = connections.keys().cloned().collect();

    for source in sources {
        if let Some(outputs) = connections.remove(&source) {
            connections.insert(source, replace_references(outputs, name, &downstream));
        }
    }
}
