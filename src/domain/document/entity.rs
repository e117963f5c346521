//! Workflow document entity
//!
//! A [`WorkflowDocument`] is only guaranteed to be a JSON object: it is what
//! the generator produced and what the fixer hands back. Typed views
//! ([`Node`], [`OutputConnections`]) are read out of it on demand and never
//! fail the whole document when a single element is malformed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::canonical;
use super::family::NodeFamily;
use super::parameters::NodeParameters;
use crate::domain::DomainError;

/// Reasons a node object cannot be read as a [`Node`]
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NodeShapeError {
    #[error("node is not an object")]
    NotAnObject,

    #[error("node is missing required field '{0}'")]
    MissingField(&'static str),
}

/// The graph artifact under repair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowDocument(Map<String, Value>);

impl WorkflowDocument {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wrap a JSON value, rejecting anything that is not an object
    pub fn from_value(value: Value) -> Result<Self, DomainError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DomainError::validation(format!(
                "workflow must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Parse a document from JSON text
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| DomainError::parse(format!("Invalid workflow JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Raw node values; empty when `nodes` is missing or not an array
    pub fn raw_nodes(&self) -> &[Value] {
        self.0
            .get("nodes")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.raw_nodes().len()
    }

    /// Well-formed nodes, in document order
    pub fn nodes(&self) -> Vec<Node> {
        self.raw_nodes()
            .iter()
            .filter_map(|value| Node::from_value(value).ok())
            .collect()
    }

    /// Names of every node that has a string name
    pub fn node_names(&self) -> Vec<&str> {
        self.raw_nodes()
            .iter()
            .filter_map(|node| node.get("name").and_then(Value::as_str))
            .collect()
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node_names().contains(&name)
    }

    pub fn raw_connections(&self) -> Option<&Map<String, Value>> {
        self.0.get("connections").and_then(Value::as_object)
    }

    /// Connections parsed per source node; malformed sources are skipped
    pub fn connections(&self) -> BTreeMap<String, OutputConnections> {
        self.raw_connections()
            .map(|map| {
                map.iter()
                    .filter_map(|(source, value)| {
                        OutputConnections::from_value(value)
                            .ok()
                            .map(|outputs| (source.clone(), outputs))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn settings(&self) -> Option<&Map<String, Value>> {
        self.0.get("settings").and_then(Value::as_object)
    }

    /// Stable hash of the canonical serialization
    pub fn content_hash(&self) -> String {
        canonical::content_hash(&self.to_value())
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl From<WorkflowDocument> for Value {
    fn from(document: WorkflowDocument) -> Self {
        document.into_value()
    }
}

impl TryFrom<Value> for WorkflowDocument {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Raw type tag together with its resolved family
#[derive(Debug, Clone, PartialEq)]
pub struct NodeType {
    pub raw: String,
    pub family: Option<NodeFamily>,
}

impl NodeType {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let family = NodeFamily::resolve(&raw);
        Self { raw, family }
    }

    pub fn is_known(&self) -> bool {
        self.family.is_some()
    }

    /// Whether the tag is spelled exactly as the engine expects
    pub fn is_canonical(&self) -> bool {
        self.family
            .is_some_and(|family| family.type_tag() == self.raw)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Canvas position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Read a `[x, y]` pair; anything else is malformed
    pub fn from_value(value: &Value) -> Option<Self> {
        let items = value.as_array()?;

        if items.len() != 2 {
            return None;
        }

        let x = items[0].as_f64().filter(|v| v.is_finite())?;
        let y = items[1].as_f64().filter(|v| v.is_finite())?;
        Some(Self { x, y })
    }

    pub fn to_value(self) -> Value {
        serde_json::json!([self.x, self.y])
    }
}

/// A typed node read from the document
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    pub type_version: Option<f64>,
    pub position: Option<Position>,
    pub parameters: NodeParameters,
    pub credentials: Option<Map<String, Value>>,
    pub on_error: Option<String>,
    pub continue_on_fail: bool,
    pub disabled: bool,
}

impl Node {
    pub fn from_value(value: &Value) -> Result<Self, NodeShapeError> {
        let map = value.as_object().ok_or(NodeShapeError::NotAnObject)?;

        let id = non_empty_str(map, "id").ok_or(NodeShapeError::MissingField("id"))?;
        let name = non_empty_str(map, "name").ok_or(NodeShapeError::MissingField("name"))?;
        let raw_type = non_empty_str(map, "type").ok_or(NodeShapeError::MissingField("type"))?;

        let node_type = NodeType::parse(raw_type);
        let empty = Map::new();
        let params = map
            .get("parameters")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            parameters: NodeParameters::parse(node_type.family, params),
            node_type,
            type_version: map.get("typeVersion").and_then(Value::as_f64),
            position: map.get("position").and_then(Position::from_value),
            credentials: map.get("credentials").and_then(Value::as_object).cloned(),
            on_error: map.get("onError").and_then(Value::as_str).map(str::to_string),
            continue_on_fail: map
                .get("continueOnFail")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            disabled: map.get("disabled").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    pub fn family(&self) -> Option<NodeFamily> {
        self.node_type.family
    }

    pub fn is_trigger(&self) -> bool {
        self.family().is_some_and(|f| f.is_trigger())
    }

    /// Explicit failure-continuation configured on the node
    pub fn has_error_handling(&self) -> bool {
        self.continue_on_fail
            || self
                .on_error
                .as_deref()
                .is_some_and(|mode| mode != "stopWorkflow")
    }
}

/// A single downstream edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub node: String,
    #[serde(rename = "type", default = "default_port_type")]
    pub port_type: String,
    #[serde(default)]
    pub index: u32,
}

fn default_port_type() -> String {
    "main".to_string()
}

impl Connection {
    pub fn main(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port_type: default_port_type(),
            index: 0,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "node": self.node,
            "type": self.port_type,
            "index": self.index,
        })
    }
}

/// Per port type, per output index, the ordered downstream connections
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputConnections {
    pub ports: BTreeMap<String, Vec<Vec<Connection>>>,
}

impl OutputConnections {
    /// Strict read: every port must be an array of arrays of connection objects
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let map = value
            .as_object()
            .ok_or_else(|| "output connections must be an object".to_string())?;
        let mut ports = BTreeMap::new();

        for (port_type, outputs) in map {
            let outputs = outputs
                .as_array()
                .ok_or_else(|| format!("port '{}' must be an array", port_type))?;
            let mut parsed = Vec::with_capacity(outputs.len());

            for output in outputs {
                let entries = match output {
                    Value::Array(entries) => entries,
                    Value::Null => {
                        parsed.push(Vec::new());
                        continue;
                    }
                    _ => {
                        return Err(format!(
                            "port '{}' must be an array of arrays",
                            port_type
                        ));
                    }
                };

                let connections = entries
                    .iter()
                    .map(|entry| {
                        serde_json::from_value::<Connection>(entry.clone())
                            .map_err(|e| format!("invalid connection entry: {}", e))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                parsed.push(connections);
            }

            ports.insert(port_type.clone(), parsed);
        }

        Ok(Self { ports })
    }

    pub fn main(&self) -> &[Vec<Connection>] {
        self.ports.get("main").map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every connection on every port, with its output index
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Connection)> {
        self.ports.values().flat_map(|outputs| {
            outputs
                .iter()
                .enumerate()
                .flat_map(|(index, entries)| entries.iter().map(move |c| (index, c)))
        })
    }

    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .ports
            .iter()
            .map(|(port, outputs)| {
                let outputs = outputs
                    .iter()
                    .map(|entries| Value::Array(entries.iter().map(Connection::to_value).collect()))
                    .collect();
                (port.clone(), Value::Array(outputs))
            })
            .collect();

        Value::Object(map)
    }
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
