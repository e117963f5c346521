//! Workflow envelope defaults

use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{Document, FixContext};
use crate::domain::document::schema;

fn default_settings() -> Value {
    json!({"executionOrder": schema::EXECUTION_ORDER_V1})
}

/// Make sure the envelope carries a name, a node list, settings and the
/// identifiers the engine expects on import. Connections are owned by the
/// connection pass.
pub(super) fn ensure_envelope(mut document: Document, context: &mut FixContext) -> Document {
    let has_name = document
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.trim().is_empty());
    if !has_name {
        document.insert("name".to_string(), json!(schema::DEFAULT_WORKFLOW_NAME));
        context.applied(format!("Named workflow '{}'", schema::DEFAULT_WORKFLOW_NAME));
    }

    if !document.get("nodes").is_some_and(Value::is_array) {
        document.insert("nodes".to_string(), json!([]));
        context.applied("Replaced missing node list");
    }

    match document.get_mut("settings") {
        Some(Value::Object(settings)) => {
            if !settings.contains_key("executionOrder") {
                settings.insert("executionOrder".to_string(), json!(schema::EXECUTION_ORDER_V1));
                context.applied("Set execution order");
            }
        }
        _ => {
            document.insert("settings".to_string(), default_settings());
            context.applied("Added default settings");
        }
    }

    let meta = document
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if !meta.is_object() {
        *meta = Value::Object(Map::new());
    }
    if let Some(meta) = meta.as_object_mut() {
        if !meta.get("instanceId").is_some_and(Value::is_string) {
            meta.insert("instanceId".to_string(), json!(Uuid::new_v4().to_string()));
            context.applied("Assigned instance id");
        }
    }

    if !document.get("versionId").is_some_and(Value::is_string) {
        document.insert("versionId".to_string(), json!(Uuid::new_v4().to_string()));
        context.applied("Assigned version id");
    }

    document
}
