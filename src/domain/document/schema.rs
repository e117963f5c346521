//! Field allow-lists for the engine's import schema
//!
//! Anything outside these lists is a by-product of generation and may be
//! stripped without semantic loss. The only deliberate asymmetry is
//! [`RESOURCE_LOCATOR_KEY`], which looks like metadata but is required inside
//! the parameters of resource-locator families.

use super::family::NodeFamily;

/// Top-level envelope fields accepted by the engine
pub const TOP_LEVEL_FIELDS: &[&str] = &[
    "id",
    "name",
    "nodes",
    "connections",
    "settings",
    "staticData",
    "pinData",
    "tags",
    "active",
    "versionId",
    "meta",
    "createdAt",
    "updatedAt",
];

/// Envelope fields that must be present for a document to be checked at all
pub const REQUIRED_TOP_LEVEL_FIELDS: &[&str] = &["name", "nodes", "connections"];

/// Fields accepted on a node object
pub const NODE_FIELDS: &[&str] = &[
    "id",
    "name",
    "type",
    "typeVersion",
    "position",
    "parameters",
    "credentials",
    "disabled",
    "notes",
    "notesInFlow",
    "retryOnFail",
    "maxTries",
    "waitBetweenTries",
    "alwaysOutputData",
    "executeOnce",
    "onError",
    "continueOnFail",
];

/// Fields accepted on a single connection entry
pub const CONNECTION_FIELDS: &[&str] = &["node", "type", "index"];

/// Output port types
pub const CONNECTION_PORT_TYPES: &[&str] = &[
    "main",
    "ai_languageModel",
    "ai_tool",
    "ai_memory",
    "ai_outputParser",
    "ai_document",
    "ai_embedding",
    "ai_retriever",
    "ai_textSplitter",
    "ai_vectorStore",
];

/// Recognised workflow settings
pub const SETTINGS_FIELDS: &[&str] = &[
    "executionOrder",
    "saveManualExecutions",
    "saveDataErrorExecution",
    "saveDataSuccessExecution",
    "saveExecutionProgress",
    "callerPolicy",
    "callerIds",
    "errorWorkflow",
    "timezone",
    "executionTimeout",
    "timeSavedPerExecution",
];

/// Recognised keys under `meta`
pub const META_FIELDS: &[&str] = &["instanceId", "templateCredsSetupCompleted"];

/// Values of `onError` the engine accepts
pub const ON_ERROR_VALUES: &[&str] = &[
    "stopWorkflow",
    "continueRegularOutput",
    "continueErrorOutput",
];

/// Modern execution order setting
pub const EXECUTION_ORDER_V1: &str = "v1";

/// Prefix marking generator-private metadata keys
pub const RESERVED_MARKER: char = '_';

/// Resource-locator marker required by some families
pub const RESOURCE_LOCATOR_KEY: &str = "__rl";

/// Default name given to documents that arrive without one
pub const DEFAULT_WORKFLOW_NAME: &str = "Generated Workflow";

pub fn is_top_level_field(key: &str) -> bool {
    TOP_LEVEL_FIELDS.contains(&key)
}

pub fn is_node_field(key: &str) -> bool {
    NODE_FIELDS.contains(&key)
}

pub fn is_connection_field(key: &str) -> bool {
    CONNECTION_FIELDS.contains(&key)
}

pub fn is_settings_field(key: &str) -> bool {
    SETTINGS_FIELDS.contains(&key)
}

pub fn is_meta_field(key: &str) -> bool {
    META_FIELDS.contains(&key)
}

pub fn is_port_type(key: &str) -> bool {
    CONNECTION_PORT_TYPES.contains(&key)
}

pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(RESERVED_MARKER)
}

/// Whether a key may appear anywhere inside a node's parameters
pub fn is_allowed_parameter_key(family: Option<NodeFamily>, key: &str) -> bool {
    if !is_reserved_key(key) {
        return true;
    }

    is_exception_key(family, key)
}

/// The documented exception list: reserved-looking keys a family needs
pub fn is_exception_key(family: Option<NodeFamily>, key: &str) -> bool {
    key == RESOURCE_LOCATOR_KEY && family.is_some_and(|f| f.uses_resource_locator())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_keys() {
        assert!(is_reserved_key("_metadata"));
        assert!(is_reserved_key("__rl"));
        assert!(!is_reserved_key("meta"));
    }

    #[test]
    fn test_resource_locator_exception_is_family_scoped() {
        assert!(is_allowed_parameter_key(Some(NodeFamily::GoogleSheets), "__rl"));
        assert!(!is_allowed_parameter_key(Some(NodeFamily::HttpRequest), "__rl"));
        assert!(!is_allowed_parameter_key(None, "__rl"));
        assert!(!is_allowed_parameter_key(Some(NodeFamily::GoogleSheets), "_source"));
        assert!(is_allowed_parameter_key(None, "url"));
    }

    #[test]
    fn test_webhook_id_is_not_allowed_on_nodes() {
        assert!(!is_node_field("webhookId"));
    }
}
