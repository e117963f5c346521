//! Node shape repairs shared by every family

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{Document, FixContext};
use crate::domain::document::{schema, NodeFamily, Position};

const GRID_X: f64 = 220.0;
const GRID_Y: f64 = 300.0;

fn family_of(node: &Map<String, Value>) -> Option<NodeFamily> {
    node.get("type")
        .and_then(Value::as_str)
        .and_then(NodeFamily::resolve)
}

fn default_name(family: Option<NodeFamily>) -> String {
    let Some(family) = family else {
        return "Node".to_string();
    };

    let short = family.type_tag().rsplit('.').next().unwrap_or("node");
    let mut chars = short.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Node".to_string(),
    }
}

fn non_empty_str<'a>(node: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    node.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// First `base N` (N >= 2) not already taken
fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    (2..)
        .map(|n| format!("{} {}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{} {}", base, Uuid::new_v4()))
}

pub(super) fn canonicalize_nodes(mut document: Document, context: &mut FixContext) -> Document {
    let raw_nodes = match document.remove("nodes") {
        Some(Value::Array(raw_nodes)) => raw_nodes,
        Some(other) => {
            document.insert("nodes".to_string(), other);
            return document;
        }
        None => return document,
    };

    let before = raw_nodes.len();
    let mut nodes: Vec<Map<String, Value>> = raw_nodes
        .into_iter()
        .filter_map(|node| match node {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    if nodes.len() < before {
        context.applied(format!("Dropped {} non-object node(s)", before - nodes.len()));
    }

    assign_ids(&mut nodes, context);
    assign_names(&mut nodes, context);

    for (index, node) in nodes.iter_mut().enumerate() {
        repair_node(node, index, context);
    }

    document.insert(
        "nodes".to_string(),
        Value::Array(nodes.into_iter().map(Value::Object).collect()),
    );
    document
}

fn assign_ids(nodes: &mut [Map<String, Value>], context: &mut FixContext) {
    let mut seen: HashSet<String> = HashSet::new();

    for node in nodes.iter_mut() {
        let current = non_empty_str(node, "id").map(str::to_string);

        match current {
            Some(id) if seen.insert(id.clone()) => {}
            previous => {
                let id = Uuid::new_v4().to_string();
                seen.insert(id.clone());
                node.insert("id".to_string(), json!(id));
                context.applied(match previous {
                    Some(old) => format!("Replaced duplicate node id '{}'", old),
                    None => "Assigned missing node id".to_string(),
                });
            }
        }
    }
}

fn assign_names(nodes: &mut [Map<String, Value>], context: &mut FixContext) {
    let mut taken: HashSet<String> = nodes
        .iter()
        .filter_map(|node| non_empty_str(node, "name"))
        .map(str::to_string)
        .collect();
    let mut seen: HashSet<String> = HashSet::new();

    for node in nodes.iter_mut() {
        let name = match non_empty_str(node, "name") {
            Some(name) if seen.insert(name.to_string()) => continue,
            Some(name) => {
                let renamed = unique_name(name, &taken);
                context.applied(format!("Renamed duplicate node '{}' to '{}'", name, renamed));
                renamed
            }
            None => {
                let base = default_name(family_of(node));
                let name = if taken.contains(&base) {
                    unique_name(&base, &taken)
                } else {
                    base
                };
                context.applied(format!("Named unnamed node '{}'", name));
                name
            }
        };

        taken.insert(name.clone());
        seen.insert(name.clone());
        node.insert("name".to_string(), json!(name));
    }
}

fn repair_node(node: &mut Map<String, Value>, index: usize, context: &mut FixContext) {
    let name = non_empty_str(node, "name").unwrap_or("node").to_string();
    let family = family_of(node);

    if !node.get("parameters").is_some_and(Value::is_object) {
        node.insert("parameters".to_string(), json!({}));
    }

    if node.get("position").and_then(Position::from_value).is_none() {
        let position = Position {
            x: GRID_X * index as f64,
            y: GRID_Y,
        };
        node.insert("position".to_string(), position.to_value());
        context.applied(format!("Laid out node '{}' on the grid", name));
    }

    let current = match node.get("typeVersion") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let wanted = match (family, current) {
        (Some(f), Some(v)) => f.exact_type_version().unwrap_or(v),
        (Some(f), None) => f.default_type_version(),
        (None, Some(v)) => v,
        (None, None) => 1.0,
    };
    let wanted = if wanted > 0.0 { wanted } else { 1.0 };

    if node.get("typeVersion").and_then(Value::as_f64) != Some(wanted) {
        node.insert("typeVersion".to_string(), json!(wanted));
        context.applied(format!("Set typeVersion {} on node '{}'", wanted, name));
    }

    if let Some(flag) = node.remove("continueOnFail") {
        if flag.as_bool() == Some(true) && !node.contains_key("onError") {
            node.insert("onError".to_string(), json!("continueRegularOutput"));
        }
        context.applied(format!("Replaced continueOnFail on node '{}'", name));
    }

    let on_error_invalid = node
        .get("onError")
        .is_some_and(|v| !v.as_str().is_some_and(|s| schema::ON_ERROR_VALUES.contains(&s)));
    if on_error_invalid {
        node.remove("onError");
        context.applied(format!("Removed invalid onError on node '{}'", name));
    }
}
