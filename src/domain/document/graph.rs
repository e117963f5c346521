//! Connection graph built leniently from a document
//!
//! Edges are collected from whatever connection structure is present, even
//! when it is not the canonical array-of-arrays shape, so that dangling and
//! orphan checks still work on malformed input.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::entity::WorkflowDocument;

/// A directed edge between two node names
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub port_type: String,
    pub output_index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionGraph {
    edges: Vec<Edge>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl ConnectionGraph {
    pub fn from_document(document: &WorkflowDocument) -> Self {
        let mut edges = Vec::new();

        if let Some(connections) = document.raw_connections() {
            for (source, outputs) in connections {
                collect_edges(source, outputs, &mut edges);
            }
        }

        let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for edge in &edges {
            adjacency
                .entry(edge.source.clone())
                .or_default()
                .insert(edge.target.clone());
        }

        Self { edges, adjacency }
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn outgoing<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.source == name)
    }

    pub fn incoming<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.target == name)
    }

    /// Every name that appears as a source or a target
    pub fn connected_names(&self) -> BTreeSet<&str> {
        self.edges
            .iter()
            .flat_map(|edge| [edge.source.as_str(), edge.target.as_str()])
            .collect()
    }

    /// First cycle found by depth-first search, as a closed path.
    /// Cycles passing through a node accepted by `allowed` are skipped.
    pub fn find_cycle<F>(&self, allowed: F) -> Option<Vec<String>>
    where
        F: Fn(&str) -> bool,
    {
        let mut state: BTreeMap<&str, VisitState> = BTreeMap::new();
        let mut stack: Vec<&str> = Vec::new();

        for start in self.adjacency.keys() {
            if state.contains_key(start.as_str()) {
                continue;
            }

            if let Some(cycle) = self.visit(start, &mut state, &mut stack, &allowed) {
                return Some(cycle);
            }
        }

        None
    }

    fn visit<'a, F>(
        &'a self,
        node: &'a str,
        state: &mut BTreeMap<&'a str, VisitState>,
        stack: &mut Vec<&'a str>,
        allowed: &F,
    ) -> Option<Vec<String>>
    where
        F: Fn(&str) -> bool,
    {
        state.insert(node, VisitState::InProgress);
        stack.push(node);

        if let Some(targets) = self.adjacency.get(node) {
            for target in targets {
                match state.get(target.as_str()) {
                    Some(VisitState::InProgress) => {
                        let start = stack.iter().position(|n| *n == target.as_str())?;
                        let mut cycle: Vec<String> =
                            stack[start..].iter().map(|n| n.to_string()).collect();

                        if cycle.iter().any(|n| allowed(n)) {
                            continue;
                        }

                        cycle.push(target.clone());
                        return Some(cycle);
                    }
                    Some(VisitState::Done) => continue,
                    None => {
                        if let Some(cycle) = self.visit(target, state, stack, allowed) {
                            return Some(cycle);
                        }
                    }
                }
            }
        }

        stack.pop();
        state.insert(node, VisitState::Done);
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Walk any nesting of arrays under a source and pick up connection targets
fn collect_edges(source: &str, outputs: &Value, edges: &mut Vec<Edge>) {
    match outputs {
        Value::Object(ports) if !ports.contains_key("node") => {
            for (port_type, value) in ports {
                match value {
                    Value::Array(items) => {
                        for (index, item) in items.iter().enumerate() {
                            collect_targets(source, port_type, index, item, edges);
                        }
                    }
                    other => collect_targets(source, port_type, 0, other, edges),
                }
            }
        }
        other => collect_targets(source, "main", 0, other, edges),
    }
}

fn collect_targets(source: &str, port_type: &str, index: usize, value: &Value, edges: &mut Vec<Edge>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_targets(source, port_type, index, item, edges);
            }
        }
        Value::Object(map) => {
            if let Some(target) = map.get("node").and_then(Value::as_str) {
                edges.push(Edge {
                    source: source.to_string(),
                    target: target.to_string(),
                    port_type: port_type.to_string(),
                    output_index: index,
                });
            }
        }
        Value::String(target) => edges.push(Edge {
            source: source.to_string(),
            target: target.clone(),
            port_type: port_type.to_string(),
            output_index: index,
        }),
        _ => {}
    }
}
