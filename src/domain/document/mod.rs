//! Workflow document model
//!
//! The document is the graph artifact exchanged with the target engine:
//! nodes joined by name through a connections map, plus settings and a small
//! set of envelope fields.

pub mod canonical;
mod entity;
pub mod expression;
mod family;
mod graph;
mod parameters;
pub mod schema;

pub use entity::{
    json_type_name, Connection, Node, NodeShapeError, NodeType, OutputConnections, Position,
    WorkflowDocument,
};
pub use family::{FamilySpec, NodeCategory, NodeFamily};
pub use graph::{ConnectionGraph, Edge};
pub use parameters::{
    locator_field, locator_value, AiParams, CodeParams, ConditionalParams, HttpParams,
    MessagingParams, MessagingPlatform, NodeParameters, ResponseParams, ScheduleParams,
    SetParams, SpreadsheetParams, SwitchParams, WebhookParams,
};
