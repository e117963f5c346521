//! Connection map reconstruction
//!
//! Rebuilds `connections` into the canonical
//! `source name -> port -> [output index] -> [entry]` shape, resolving
//! id-keyed and loosely cased references and dropping whatever points at a
//! node that does not exist.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};

use super::{Document, FixContext};
use crate::domain::document::schema;

type Outputs = Vec<Vec<Value>>;
type Ports = Map<String, Value>;

/// Highest output index accepted from edge-list input
const MAX_OUTPUT_INDEX: usize = 63;

/// Node references by name and id
struct NodeIndex {
    names: Vec<String>,
    by_id: HashMap<String, String>,
}

impl NodeIndex {
    fn from_document(document: &Document) -> Self {
        let mut names = Vec::new();
        let mut by_id = HashMap::new();

        for node in document
            .get("nodes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let Some(name) = node.get("name").and_then(Value::as_str) else {
                continue;
            };
            names.push(name.to_string());
            if let Some(id) = node.get("id").and_then(Value::as_str) {
                by_id.insert(id.to_string(), name.to_string());
            }
        }

        Self { names, by_id }
    }

    /// Exact name, then node id, then a unique case-insensitive name match
    fn resolve(&self, reference: &str) -> Option<String> {
        if self.names.iter().any(|name| name == reference) {
            return Some(reference.to_string());
        }

        if let Some(name) = self.by_id.get(reference) {
            return Some(name.clone());
        }

        let mut matches = self
            .names
            .iter()
            .filter(|name| name.eq_ignore_ascii_case(reference));
        match (matches.next(), matches.next()) {
            (Some(name), None) => Some(name.clone()),
            _ => None,
        }
    }
}

fn port_key(raw: &str) -> Option<String> {
    if schema::is_port_type(raw) {
        return Some(raw.to_string());
    }

    schema::CONNECTION_PORT_TYPES
        .iter()
        .find(|port| port.eq_ignore_ascii_case(raw))
        .map(|port| port.to_string())
}

fn entry_index(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

struct Rebuild<'a> {
    index: &'a NodeIndex,
    dropped: Vec<String>,
}

impl Rebuild<'_> {
    fn entry(&mut self, entry: &Value, port: &str) -> Option<Value> {
        let (reference, port_type, index) = match entry {
            Value::String(reference) => (reference.as_str(), port.to_string(), 0),
            Value::Object(map) => {
                let reference = map.get("node").and_then(Value::as_str)?;
                let port_type = map
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(port_key)
                    .unwrap_or_else(|| port.to_string());
                (reference, port_type, entry_index(map.get("index")))
            }
            _ => return None,
        };

        match self.index.resolve(reference) {
            Some(node) => Some(json!({"node": node, "type": port_type, "index": index})),
            None => {
                self.dropped.push(reference.to_string());
                None
            }
        }
    }

    fn entries(&mut self, list: &[Value], port: &str) -> Vec<Value> {
        let mut entries: Vec<Value> = Vec::new();
        for entry in list {
            if let Some(entry) = self.entry(entry, port) {
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
        }
        entries
    }

    /// Per-output entry lists, accepting flat lists and single entries
    fn outputs(&mut self, value: &Value, port: &str) -> Outputs {
        match value {
            Value::Array(items) if items.iter().all(|i| i.is_array() || i.is_null()) => items
                .iter()
                .map(|item| match item {
                    Value::Array(list) => self.entries(list, port),
                    _ => Vec::new(),
                })
                .collect(),
            Value::Array(items) => vec![self.entries(items, port)],
            Value::Object(_) | Value::String(_) => vec![self.entries(std::slice::from_ref(value), port)],
            _ => Vec::new(),
        }
    }

    fn merge(ports: &mut BTreeMap<String, Outputs>, port: String, outputs: Outputs) {
        let existing = ports.entry(port).or_default();
        for (i, list) in outputs.into_iter().enumerate() {
            if existing.len() <= i {
                existing.resize_with(i + 1, Vec::new);
            }
            for entry in list {
                if !existing[i].contains(&entry) {
                    existing[i].push(entry);
                }
            }
        }
    }

    fn source(&mut self, value: &Value, ports: &mut BTreeMap<String, Outputs>) {
        match value {
            Value::Object(raw_ports) => {
                for (raw_port, lists) in raw_ports {
                    let Some(port) = port_key(raw_port) else {
                        continue;
                    };
                    let outputs = self.outputs(lists, &port);
                    Self::merge(ports, port, outputs);
                }
            }
            Value::Array(_) => {
                let outputs = self.outputs(value, "main");
                Self::merge(ports, "main".to_string(), outputs);
            }
            _ => {}
        }
    }

    /// Edge-list form: `[{source|from, target|to, output?, input?}]`
    fn edge_list(&mut self, edges: &[Value]) -> BTreeMap<String, BTreeMap<String, Outputs>> {
        let mut sources: BTreeMap<String, BTreeMap<String, Outputs>> = BTreeMap::new();

        for edge in edges {
            let Some(edge) = edge.as_object() else {
                continue;
            };
            let source = edge
                .get("source")
                .or_else(|| edge.get("from"))
                .and_then(Value::as_str);
            let target = edge.get("target").or_else(|| edge.get("to")).and_then(Value::as_str);
            let (Some(source), Some(target)) = (source, target) else {
                continue;
            };
            let Some(source) = self.index.resolve(source) else {
                self.dropped.push(source.to_string());
                continue;
            };

            let output = entry_index(edge.get("output").or_else(|| edge.get("sourceOutput"))) as usize;
            if output > MAX_OUTPUT_INDEX {
                continue;
            }
            let input = entry_index(edge.get("input").or_else(|| edge.get("targetInput")));
            let Some(entry) = self.entry(&json!({"node": target, "index": input}), "main") else {
                continue;
            };

            let mut outputs: Outputs = vec![Vec::new(); output + 1];
            outputs[output].push(entry);
            Self::merge(sources.entry(source).or_default(), "main".to_string(), outputs);
        }

        sources
    }

    fn rebuild(&mut self, original: Option<&Value>) -> Map<String, Value> {
        let sources = match original {
            Some(Value::Object(raw)) => {
                let mut sources: BTreeMap<String, BTreeMap<String, Outputs>> = BTreeMap::new();
                for (raw_source, value) in raw {
                    let Some(source) = self.index.resolve(raw_source) else {
                        self.dropped.push(raw_source.clone());
                        continue;
                    };
                    self.source(value, sources.entry(source).or_default());
                }
                sources
            }
            Some(Value::Array(edges)) => self.edge_list(edges),
            _ => BTreeMap::new(),
        };

        sources
            .into_iter()
            .filter_map(|(source, ports)| {
                let ports: Ports = ports
                    .into_iter()
                    .filter(|(_, outputs)| outputs.iter().any(|list| !list.is_empty()))
                    .map(|(port, outputs)| (port, json!(outputs)))
                    .collect();
                (!ports.is_empty()).then(|| (source, Value::Object(ports)))
            })
            .collect()
    }
}

pub(super) fn rebuild_connections(mut document: Document, context: &mut FixContext) -> Document {
    let index = NodeIndex::from_document(&document);
    let original = document.remove("connections");

    let mut rebuild = Rebuild {
        index: &index,
        dropped: Vec::new(),
    };
    let connections = Value::Object(rebuild.rebuild(original.as_ref()));

    let mut dropped = rebuild.dropped;
    dropped.sort();
    dropped.dedup();
    for missing in &dropped {
        context.applied(format!("Dropped connection referencing missing node '{}'", missing));
    }

    if dropped.is_empty() && original.as_ref() != Some(&connections) {
        context.applied("Normalized connection structure");
    }

    document.insert("connections".to_string(), connections);
    document
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(nodes: Value, connections: Value) -> (Value, FixContext) {
        let mut context = FixContext::default();
        let document = json!({"nodes": nodes, "connections": connections});
        let document = rebuild_connections(document.as_object().cloned().unwrap(), &mut context);
        (document["connections"].clone(), context)
    }

    fn nodes() -> Value {
        json!([
            {"id": "n1", "name": "Start"},
            {"id": "n2", "name": "Fetch"},
            {"id": "n3", "name": "Store"}
        ])
    }

    #[test]
    fn test_canonical_connections_untouched() {
        let connections = json!({
            "Start": {"main": [[{"node": "Fetch", "type": "main", "index": 0}]]},
            "Fetch": {"main": [[], [{"node": "Store", "type": "main", "index": 0}]]}
        });
        let (rebuilt, context) = run(nodes(), connections.clone());

        assert_eq!(rebuilt, connections);
        assert!(context.applied.is_empty());
    }

    #[test]
    fn test_ids_and_loose_shapes_resolved() {
        let (rebuilt, _) = run(
            nodes(),
            json!({
                "n1": {"Main": [{"node": "n2"}]},
                "Fetch": ["store"]
            }),
        );

        assert_eq!(
            rebuilt,
            json!({
                "Start": {"main": [[{"node": "Fetch", "type": "main", "index": 0}]]},
                "Fetch": {"main": [[{"node": "Store", "type": "main", "index": 0}]]}
            })
        );
    }

    #[test]
    fn test_dangling_references_dropped() {
        let (rebuilt, context) = run(
            nodes(),
            json!({
                "Start": {"main": [[{"node": "Ghost", "type": "main", "index": 0}]]},
                "Phantom": {"main": [[{"node": "Store", "type": "main", "index": 0}]]},
                "Fetch": {"main": [[{"node": "Store", "type": "main", "index": "0"}]], "weird": [[]]}
            }),
        );

        assert_eq!(
            rebuilt,
            json!({"Fetch": {"main": [[{"node": "Store", "type": "main", "index": 0}]]}})
        );
        assert_eq!(context.applied.len(), 2);
    }

    #[test]
    fn test_edge_list_form() {
        let (rebuilt, _) = run(
            nodes(),
            json!([
                {"source": "Start", "target": "Fetch"},
                {"from": "Fetch", "to": "Store", "output": 1}
            ]),
        );

        assert_eq!(rebuilt["Start"]["main"][0][0]["node"], "Fetch");
        assert_eq!(rebuilt["Fetch"]["main"], json!([[], [{"node": "Store", "type": "main", "index": 0}]]));
    }

    #[test]
    fn test_missing_or_invalid_becomes_empty_map() {
        let (rebuilt, _) = run(nodes(), json!(null));
        assert_eq!(rebuilt, json!({}));

        let (rebuilt, _) = run(nodes(), json!("nope"));
        assert_eq!(rebuilt, json!({}));
    }
}
