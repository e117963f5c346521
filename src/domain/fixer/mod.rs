//! Deterministic fixer
//!
//! A strictly ordered pipeline of passes, each a transform over the document
//! map. Later passes assume the structure earlier passes normalized. The
//! fixer never fails: whatever cannot be repaired is left for the validator
//! to report.

mod connections;
mod envelope;
mod expressions;
mod families;
mod node_types;
mod nodes;
mod noop;
mod strip;
mod targeted;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::classifier::ErrorClassification;
use crate::domain::document::WorkflowDocument;

pub use expressions::rewrite_expressions;
pub use strip::strip_reserved_keys;

type Document = Map<String, Value>;

/// Notes collected while the passes run
#[derive(Debug, Default)]
pub struct FixContext {
    applied: Vec<String>,
    suggestions: Vec<String>,
}

impl FixContext {
    /// Record a change made to the document
    pub fn applied(&mut self, note: impl Into<String>) {
        self.applied.push(note.into());
    }

    /// Record advice for the caller; never written into the document
    pub fn suggest(&mut self, suggestion: impl Into<String>) {
        let suggestion = suggestion.into();
        if !self.suggestions.contains(&suggestion) {
            self.suggestions.push(suggestion);
        }
    }
}

/// A single pipeline stage
struct Pass {
    name: &'static str,
    run: fn(Document, &mut FixContext) -> Document,
}

/// Pipeline order; later passes rely on earlier normalization
const PIPELINE: &[Pass] = &[
    Pass {
        name: "remove_noop_nodes",
        run: noop::remove_noop_nodes,
    },
    Pass {
        name: "normalize_node_types",
        run: node_types::normalize_node_types,
    },
    Pass {
        name: "rewrite_expressions",
        run: expressions::rewrite_document_expressions,
    },
    Pass {
        name: "canonicalize_nodes",
        run: nodes::canonicalize_nodes,
    },
    Pass {
        name: "canonicalize_families",
        run: families::canonicalize_families,
    },
    Pass {
        name: "ensure_envelope",
        run: envelope::ensure_envelope,
    },
    Pass {
        name: "rebuild_connections",
        run: connections::rebuild_connections,
    },
    Pass {
        name: "strip_unknown_fields",
        run: strip::strip_unknown_fields,
    },
    Pass {
        name: "inject_family_defaults",
        run: families::inject_family_defaults,
    },
];

/// Output of a fixer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixReport {
    pub workflow: WorkflowDocument,
    /// Human-readable descriptions of the changes made
    pub applied: Vec<String>,
    pub suggestions: Vec<String>,
}

impl FixReport {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Pure, non-network document repair
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixer;

impl Fixer {
    pub fn new() -> Self {
        Self
    }

    /// Run the full pipeline
    pub fn fix(&self, document: WorkflowDocument) -> FixReport {
        let mut context = FixContext::default();
        let map = run_pipeline(document.into_value(), &mut context);
        finish(map, context)
    }

    /// Apply the classification's targeted repair, then the full pipeline
    pub fn fix_with(
        &self,
        document: WorkflowDocument,
        classification: &ErrorClassification,
    ) -> FixReport {
        let mut context = FixContext::default();
        let map = targeted::apply(into_map(document.into_value()), classification, &mut context);
        let map = run_pipeline(Value::Object(map), &mut context);
        finish(map, context)
    }
}

fn into_map(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn run_pipeline(value: Value, context: &mut FixContext) -> Document {
    PIPELINE.iter().fold(into_map(value), |document, pass| {
        let before = context.applied.len();
        let document = (pass.run)(document, context);
        let changes = context.applied.len() - before;
        if changes > 0 {
            debug!(pass = pass.name, changes, "Fixer pass applied changes");
        }
        document
    })
}

fn finish(map: Document, context: FixContext) -> FixReport {
    FixReport {
        workflow: WorkflowDocument::new(map),
        applied: context.applied,
        suggestions: context.suggestions,
    }
}

/// Node objects of the document, if `nodes` is an array
pub(crate) fn nodes_mut(document: &mut Document) -> Option<&mut Vec<Value>> {
    document.get_mut("nodes").and_then(Value::as_array_mut)
}

pub(crate) fn node_name(node: &Value) -> Option<&str> {
    node.get("name").and_then(Value::as_str)
}

/// Names of all nodes, in document order
pub(crate) fn node_names(document: &Document) -> Vec<String> {
    document
        .get("nodes")
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .filter_map(node_name)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
