//! Family-specific parameter canonicalization
//!
//! Each family gets a dedicated routine that renames deprecated keys,
//! collapses historical resource-reference shapes into `__rl` locators and
//! drops keys the engine rejects for that family. Required defaults are
//! injected by [`inject_family_defaults`], which runs after stripping.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use super::{node_name, nodes_mut, Document, FixContext};
use crate::domain::document::{ConnectionGraph, NodeFamily, NodeParameters, WorkflowDocument};

type Params = Map<String, Value>;

static SLACK_CHANNEL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[CGDU][A-Z0-9]{6,}$").unwrap());
static SLUG_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Families whose parameters must always carry an `options` object
pub(super) const OPTIONS_FAMILIES: &[NodeFamily] = &[
    NodeFamily::If,
    NodeFamily::Filter,
    NodeFamily::Switch,
    NodeFamily::Set,
    NodeFamily::HttpRequest,
    NodeFamily::WebhookTrigger,
    NodeFamily::RespondToWebhook,
    NodeFamily::Merge,
    NodeFamily::SplitInBatches,
];

/// Options the HTTP request node accepts
const HTTP_OPTIONS: &[&str] = &[
    "allowUnauthorizedCerts",
    "batching",
    "lowercaseHeaders",
    "proxy",
    "queryParameterArrays",
    "redirect",
    "response",
    "timeout",
];

/// Parameter objects whose string booleans are coerced
const BOOLEAN_BAGS: &[&str] = &["options", "additionalFields"];

const LEGACY_CONDITION_TYPES: &[&str] = &["string", "number", "boolean", "dateTime"];

/// Change notes for one node
type Changes = Vec<&'static str>;

fn family_of(node: &Value) -> Option<NodeFamily> {
    node.get("type")
        .and_then(Value::as_str)
        .and_then(NodeFamily::resolve)
}

/// Move `from` to `to`; when both exist the deprecated key is dropped
fn rename_key(params: &mut Params, from: &str, to: &str) -> bool {
    let Some(value) = params.remove(from) else {
        return false;
    };

    if !params.contains_key(to) {
        params.insert(to.to_string(), value);
    }
    true
}

/// Wrap a plain identifier as a resource locator
fn locator(value: &Value, default_mode: &str) -> Option<Value> {
    match value {
        Value::String(s) => {
            let mode = if s.starts_with("http://") || s.starts_with("https://") {
                "url"
            } else {
                default_mode
            };
            Some(json!({"__rl": true, "value": s, "mode": mode}))
        }
        Value::Number(n) => Some(json!({"__rl": true, "value": n.to_string(), "mode": default_mode})),
        Value::Object(map) if map.get("__rl") != Some(&Value::Bool(true)) && map.contains_key("value") => {
            let mut map = map.clone();
            map.insert("__rl".to_string(), json!(true));
            map.entry("mode").or_insert_with(|| json!(default_mode));
            Some(Value::Object(map))
        }
        _ => None,
    }
}

fn ensure_locator(params: &mut Params, key: &str, default_mode: &str) -> bool {
    let Some(wrapped) = params.get(key).and_then(|v| locator(v, default_mode)) else {
        return false;
    };
    params.insert(key.to_string(), wrapped);
    true
}

pub(super) fn slug(name: &str) -> String {
    let lowered = name.to_lowercase();
    let slug = SLUG_SEPARATOR.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "webhook".to_string()
    } else {
        slug.to_string()
    }
}

fn coerce_booleans(value: &mut Value) -> bool {
    match value {
        Value::String(s) if s == "true" || s == "false" => {
            *value = Value::Bool(s == "true");
            true
        }
        Value::Object(map) => map
            .values_mut()
            .fold(false, |changed, child| coerce_booleans(child) || changed),
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, child| coerce_booleans(child) || changed),
        _ => false,
    }
}

pub(super) fn canonicalize_families(mut document: Document, context: &mut FixContext) -> Document {
    if let Some(nodes) = nodes_mut(&mut document) {
        for node in nodes.iter_mut() {
            let Some(family) = family_of(node) else {
                continue;
            };
            let name = node_name(node).unwrap_or("node").to_string();
            let Some(params) = node.get_mut("parameters").and_then(Value::as_object_mut) else {
                continue;
            };

            let mut changes = Changes::new();
            canonicalize(family, &name, params, &mut changes);

            for bag in BOOLEAN_BAGS {
                if params.get_mut(*bag).is_some_and(coerce_booleans) {
                    changes.push("Coerced string booleans");
                }
            }

            for change in changes {
                context.applied(format!("{} on node '{}'", change, name));
            }
        }
    }

    suggest(&document, context);
    document
}

fn canonicalize(family: NodeFamily, name: &str, params: &mut Params, changes: &mut Changes) {
    match family {
        NodeFamily::If | NodeFamily::Filter => conditional(params, changes),
        NodeFamily::Switch => {
            if let Some(rules) = params.get_mut("rules").and_then(Value::as_object_mut) {
                if rename_key(rules, "rules", "values") {
                    changes.push("Moved switch rules to 'values'");
                }
            }
        }
        NodeFamily::Set => set(params, changes),
        NodeFamily::Code => code(params, changes),
        NodeFamily::HttpRequest => http(params, changes),
        NodeFamily::Slack => slack(params, changes),
        NodeFamily::Telegram => {
            if let Some(Value::Number(n)) = params.get("chatId") {
                let chat = n.to_string();
                params.insert("chatId".to_string(), json!(chat));
                changes.push("Converted chatId to a string");
            }
        }
        NodeFamily::Gmail => {
            if let Some(Value::Array(recipients)) = params.get("toList") {
                let joined: Vec<&str> = recipients.iter().filter_map(Value::as_str).collect();
                let joined = joined.join(", ");
                params.insert("toList".to_string(), json!(joined));
            }
            if rename_key(params, "toList", "sendTo") {
                changes.push("Renamed toList to sendTo");
            }
        }
        NodeFamily::EmailSend => {
            if rename_key(params, "to", "toEmail") {
                changes.push("Renamed to to toEmail");
            }
        }
        NodeFamily::GoogleSheets => {
            if rename_key(params, "sheetId", "documentId") {
                changes.push("Renamed sheetId to documentId");
            }
            if ensure_locator(params, "documentId", "id") | ensure_locator(params, "sheetName", "name") {
                changes.push("Converted sheet references to resource locators");
            }
        }
        NodeFamily::GoogleDrive => {
            let mut converted = false;
            for key in ["fileId", "folderId", "driveId"] {
                converted |= ensure_locator(params, key, "id");
            }
            if converted {
                changes.push("Converted drive references to resource locators");
            }
        }
        NodeFamily::Airtable => {
            if rename_key(params, "application", "base") {
                changes.push("Renamed application to base");
            }
            if ensure_locator(params, "base", "id") | ensure_locator(params, "table", "id") {
                changes.push("Converted Airtable references to resource locators");
            }
        }
        NodeFamily::Notion => {
            if ensure_locator(params, "databaseId", "id") | ensure_locator(params, "pageId", "id") {
                changes.push("Converted Notion references to resource locators");
            }
        }
        NodeFamily::OpenAi => {
            if params.get("model").is_some_and(Value::is_string) && rename_key(params, "model", "modelId") {
                changes.push("Renamed model to modelId");
            }
            if ensure_locator(params, "modelId", "list") {
                changes.push("Converted model to a resource locator");
            }
        }
        NodeFamily::LmChatOpenAi => {
            if ensure_locator(params, "model", "list") {
                changes.push("Converted model to a resource locator");
            }
        }
        NodeFamily::ScheduleTrigger => schedule(params, changes),
        NodeFamily::WebhookTrigger => webhook(name, params, changes),
        NodeFamily::SplitInBatches => {
            let parsed = params
                .get("batchSize")
                .and_then(Value::as_str)
                .and_then(|s| s.trim().parse::<u64>().ok());
            if let Some(size) = parsed {
                params.insert("batchSize".to_string(), json!(size));
                changes.push("Converted batchSize to a number");
            }
        }
        NodeFamily::Merge => merge(params, changes),
        _ => {}
    }
}

fn map_operation(kind: &str, operation: &str) -> &'static str {
    match (kind, operation) {
        (_, "equal") => "equals",
        (_, "notEqual") => "notEquals",
        (_, "isEmpty") => "empty",
        (_, "isNotEmpty") => "notEmpty",
        ("number", "smaller") => "lt",
        ("number", "smallerEqual") => "lte",
        ("number", "larger") => "gt",
        ("number", "largerEqual") => "gte",
        (_, "contains") => "contains",
        (_, "notContains") => "notContains",
        (_, "startsWith") => "startsWith",
        (_, "endsWith") => "endsWith",
        (_, "regex") => "regex",
        (_, "notRegex") => "notRegex",
        (_, "after") => "after",
        (_, "before") => "before",
        _ => "equals",
    }
}

fn conditional(params: &mut Params, changes: &mut Changes) {
    let legacy = params
        .get("conditions")
        .and_then(Value::as_object)
        .filter(|c| !c.contains_key("conditions"))
        .filter(|c| LEGACY_CONDITION_TYPES.iter().any(|k| c.contains_key(*k)))
        .cloned();

    let combine = params.remove("combineOperation");

    let Some(legacy) = legacy else {
        if let Some(combine) = combine {
            let combinator = if combine.as_str() == Some("any") { "or" } else { "and" };
            if let Some(conditions) = params.get_mut("conditions").and_then(Value::as_object_mut) {
                conditions
                    .entry("combinator")
                    .or_insert_with(|| json!(combinator));
            }
            changes.push("Replaced combineOperation with combinator");
        }
        return;
    };

    let combinator = match combine.as_ref().and_then(Value::as_str) {
        Some("any") => "or",
        _ => "and",
    };

    let mut conditions = Vec::new();

    for kind in LEGACY_CONDITION_TYPES {
        let Some(list) = legacy.get(*kind).and_then(Value::as_array) else {
            continue;
        };

        for condition in list {
            let operation = condition
                .get("operation")
                .and_then(Value::as_str)
                .unwrap_or("equal");
            let operation = map_operation(kind, operation);
            let mut operator = json!({"type": kind, "operation": operation});
            if matches!(operation, "empty" | "notEmpty") {
                operator["singleValue"] = json!(true);
            }

            conditions.push(json!({
                "leftValue": condition.get("value1").cloned().unwrap_or_else(|| json!("")),
                "rightValue": condition.get("value2").cloned().unwrap_or_else(|| json!("")),
                "operator": operator,
            }));
        }
    }

    params.insert(
        "conditions".to_string(),
        json!({
            "options": {"caseSensitive": true, "leftValue": "", "typeValidation": "strict"},
            "conditions": conditions,
            "combinator": combinator,
        }),
    );
    changes.push("Converted legacy conditions");
}

fn set(params: &mut Params, changes: &mut Changes) {
    if let Some(keep_only) = params.remove("keepOnlySet") {
        let keep_only = keep_only.as_bool().unwrap_or(keep_only.as_str() == Some("true"));
        params
            .entry("includeOtherFields")
            .or_insert_with(|| json!(!keep_only));
        changes.push("Replaced keepOnlySet with includeOtherFields");
    }

    let Some(values) = params.get("values").filter(|v| v.is_object()).cloned() else {
        return;
    };
    params.remove("values");

    if params.contains_key("assignments") {
        changes.push("Dropped legacy values");
        return;
    }

    let mut assignments = Vec::new();

    for kind in ["string", "number", "boolean"] {
        let Some(list) = values.get(kind).and_then(Value::as_array) else {
            continue;
        };

        for item in list {
            let value = item.get("value").cloned().unwrap_or(Value::Null);
            let value = match (kind, &value) {
                ("number", Value::String(s)) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(value),
                ("boolean", Value::String(s)) if s == "true" || s == "false" => json!(s == "true"),
                _ => value,
            };

            assignments.push(json!({
                "name": item.get("name").cloned().unwrap_or_else(|| json!("")),
                "value": value,
                "type": kind,
            }));
        }
    }

    params.insert("assignments".to_string(), json!({"assignments": assignments}));
    changes.push("Converted legacy values to assignments");
}

fn code(params: &mut Params, changes: &mut Changes) {
    if rename_key(params, "functionCode", "jsCode") {
        changes.push("Renamed functionCode to jsCode");
    }

    let language = params.get("language").and_then(Value::as_str).map(str::to_lowercase);
    let canonical = match language.as_deref() {
        Some("javascript") | Some("js") => Some("javaScript"),
        Some("python") | Some("py") => Some("python"),
        _ => None,
    };

    if let Some(canonical) = canonical {
        if params.get("language").and_then(Value::as_str) != Some(canonical) {
            params.insert("language".to_string(), json!(canonical));
            changes.push("Normalized code language");
        }
    }
}

/// `{parameter: [{name, value}]}` UI collections to `{parameters: [...]}`
fn ui_parameters(value: &Value) -> Value {
    let list = value
        .get("parameter")
        .or_else(|| value.get("parameters"))
        .cloned()
        .unwrap_or_else(|| json!([]));
    json!({"parameters": list})
}

fn http(params: &mut Params, changes: &mut Changes) {
    if rename_key(params, "requestMethod", "method") {
        changes.push("Renamed requestMethod to method");
    }

    match params.get("method") {
        Some(Value::String(method)) if method.to_uppercase() != *method => {
            let upper = method.to_uppercase();
            params.insert("method".to_string(), json!(upper));
            changes.push("Uppercased HTTP method");
        }
        Some(Value::String(_)) | None => {}
        Some(_) => {
            params.remove("method");
            changes.push("Removed non-string HTTP method");
        }
    }

    if params.remove("jsonParameters").is_some() {
        changes.push("Removed jsonParameters");
    }

    if let Some(body) = params.remove("bodyParametersJson") {
        let body = match body {
            Value::String(s) => s,
            other => other.to_string(),
        };
        params.insert("sendBody".to_string(), json!(true));
        params.insert("specifyBody".to_string(), json!("json"));
        params.entry("jsonBody").or_insert_with(|| json!(body));
        changes.push("Converted bodyParametersJson to jsonBody");
    }

    for (legacy, current, flag) in [
        ("headerParametersUi", "headerParameters", "sendHeaders"),
        ("queryParametersUi", "queryParameters", "sendQuery"),
        ("bodyParametersUi", "bodyParameters", "sendBody"),
    ] {
        if let Some(ui) = params.remove(legacy) {
            params.insert(flag.to_string(), json!(true));
            params
                .entry(current)
                .or_insert_with(|| ui_parameters(&ui));
            changes.push("Converted legacy parameter collection");
        }
    }

    if let Some(Value::Object(headers)) = params.get("headers").cloned() {
        params.remove("headers");
        let list: Vec<Value> = headers
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                json!({"name": name, "value": value})
            })
            .collect();
        params.insert("sendHeaders".to_string(), json!(true));
        params
            .entry("headerParameters")
            .or_insert_with(|| json!({"parameters": list}));
        changes.push("Converted headers map to headerParameters");
    }

    if params.remove("responseFormat").is_some() {
        changes.push("Removed responseFormat");
    }

    if let Some(options) = params.get_mut("options").and_then(Value::as_object_mut) {
        let before = options.len();
        options.retain(|key, _| HTTP_OPTIONS.contains(&key.as_str()));
        if options.len() < before {
            changes.push("Removed unsupported HTTP options");
        }
    }
}

fn slack(params: &mut Params, changes: &mut Changes) {
    if params.get("channel").is_some_and(Value::is_string) && !params.contains_key("channelId") {
        if let Some(channel) = params.remove("channel") {
            params.insert("channelId".to_string(), channel);
            changes.push("Renamed channel to channelId");
        }
    }

    let mode = match params.get("channelId").and_then(Value::as_str) {
        Some(channel) if SLACK_CHANNEL_ID.is_match(channel) => "id",
        _ => "name",
    };
    if ensure_locator(params, "channelId", mode) {
        changes.push("Converted channel to a resource locator");
    }

    if params.contains_key("channelId") && !params.contains_key("select") {
        params.insert("select".to_string(), json!("channel"));
        changes.push("Selected channel target");
    }
}

fn interval_rule(field: &str, amount: Option<&Value>) -> Value {
    let mut rule = json!({"field": field});
    if let Some(amount) = amount.and_then(Value::as_u64) {
        rule[format!("{}Interval", field)] = json!(amount);
    }
    rule
}

fn cron_item(item: &Value) -> Value {
    let hour = item.get("hour").cloned();
    let minute = item.get("minute").cloned();
    let mode = item.get("mode").and_then(Value::as_str).unwrap_or("everyDay");

    let mut rule = match mode {
        "everyMinute" => json!({"field": "minutes", "minutesInterval": 1}),
        "everyHour" => json!({"field": "hours", "hoursInterval": 1}),
        "everyWeek" => json!({
            "field": "weeks",
            "triggerAtDay": [item.get("weekday").cloned().unwrap_or_else(|| json!(1))]
        }),
        "everyMonth" => json!({
            "field": "months",
            "triggerAtDayOfMonth": item.get("dayOfMonth").cloned().unwrap_or_else(|| json!(1))
        }),
        "everyX" => {
            let unit = item.get("unit").and_then(Value::as_str).unwrap_or("hours");
            interval_rule(unit, item.get("value"))
        }
        "custom" => json!({
            "field": "cronExpression",
            "expression": item.get("cronExpression").cloned().unwrap_or_else(|| json!("0 * * * *"))
        }),
        _ => json!({"field": "days"}),
    };

    if !matches!(mode, "everyMinute" | "everyX" | "custom") {
        if let Some(minute) = minute {
            rule["triggerAtMinute"] = minute;
        }
        if mode != "everyHour" {
            if let Some(hour) = hour {
                rule["triggerAtHour"] = hour;
            }
        }
    }

    rule
}

fn schedule(params: &mut Params, changes: &mut Changes) {
    if let Some(times) = params.remove("triggerTimes") {
        let items = times
            .get("item")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let intervals: Vec<Value> = items.iter().map(cron_item).collect();
        params
            .entry("rule")
            .or_insert_with(|| json!({"interval": intervals}));
        changes.push("Converted cron trigger times to schedule rules");
    }

    if let Some(amount) = params.remove("interval") {
        let unit = params
            .remove("unit")
            .and_then(|u| u.as_str().map(str::to_string))
            .unwrap_or_else(|| "seconds".to_string());
        params
            .entry("rule")
            .or_insert_with(|| json!({"interval": [interval_rule(&unit, Some(&amount))]}));
        changes.push("Converted interval trigger to a schedule rule");
    }

    if let Some(expression) = params.remove("cronExpression") {
        params.entry("rule").or_insert_with(|| {
            json!({"interval": [{"field": "cronExpression", "expression": expression}]})
        });
        changes.push("Converted cronExpression to a schedule rule");
    }

    if let Some(rule) = params.get_mut("rule").and_then(Value::as_object_mut) {
        if let Some(single) = rule.get("interval").filter(|i| i.is_object()).cloned() {
            rule.insert("interval".to_string(), json!([single]));
            changes.push("Wrapped schedule interval in a list");
        }
    }
}

fn webhook(name: &str, params: &mut Params, changes: &mut Changes) {
    if rename_key(params, "method", "httpMethod") {
        changes.push("Renamed method to httpMethod");
    }

    let missing_path = params
        .get("path")
        .and_then(Value::as_str)
        .is_none_or(|p| p.trim().is_empty());
    if missing_path {
        params.insert("path".to_string(), json!(slug(name)));
        changes.push("Derived webhook path from node name");
    }

    if let Some(method) = params.get("httpMethod").and_then(Value::as_str) {
        let upper = method.to_uppercase();
        if upper != method {
            params.insert("httpMethod".to_string(), json!(upper));
            changes.push("Uppercased webhook method");
        }
    }
}

fn merge(params: &mut Params, changes: &mut Changes) {
    let Some(mode) = params.get("mode").and_then(Value::as_str) else {
        return;
    };

    let (mode, combine_by) = match mode {
        "mergeByIndex" => ("combine", Some("combineByPosition")),
        "mergeByKey" => ("combine", Some("combineByFields")),
        "multiplex" => ("combine", Some("combineAll")),
        "passThrough" | "wait" => ("chooseBranch", None),
        _ => return,
    };

    params.insert("mode".to_string(), json!(mode));
    if let Some(combine_by) = combine_by {
        params.insert("combineBy".to_string(), json!(combine_by));
    }
    changes.push("Converted legacy merge mode");
}

/// Node-level advice; returned to the caller, never written to the document
fn suggest(document: &Document, context: &mut FixContext) {
    let workflow = WorkflowDocument::new(document.clone());
    let graph = ConnectionGraph::from_document(&workflow);

    for node in workflow.nodes() {
        match node.family() {
            Some(NodeFamily::If) => {
                let outgoing: Vec<_> = graph.outgoing(&node.name).collect();
                if !outgoing.is_empty() && outgoing.iter().all(|edge| edge.output_index == 0) {
                    context.suggest(format!(
                        "'{}' only uses its true branch; a Filter node would be simpler",
                        node.name
                    ));
                }
            }
            Some(NodeFamily::Switch) => {
                if let NodeParameters::Switch(params) = &node.parameters {
                    if params.rules.len() == 1 {
                        context.suggest(format!(
                            "'{}' routes on a single rule; an If node would be simpler",
                            node.name
                        ));
                    }
                }
            }
            Some(NodeFamily::HttpRequest) if !node.has_error_handling() => {
                context.suggest(format!(
                    "'{}' calls an external service; consider setting onError or retryOnFail",
                    node.name
                ));
            }
            _ => {}
        }
    }
}

/// Inject family-required defaults. Runs after stripping.
pub(super) fn inject_family_defaults(mut document: Document, context: &mut FixContext) -> Document {
    let Some(nodes) = nodes_mut(&mut document) else {
        return document;
    };

    for node in nodes.iter_mut() {
        let Some(family) = family_of(node) else {
            continue;
        };
        let name = node_name(node).unwrap_or("node").to_string();
        let Some(params) = node.get_mut("parameters").and_then(Value::as_object_mut) else {
            continue;
        };

        if OPTIONS_FAMILIES.contains(&family) && !params.get("options").is_some_and(Value::is_object) {
            params.insert("options".to_string(), json!({}));
            context.applied(format!("Added options to node '{}'", name));
        }

        if matches!(family, NodeFamily::If | NodeFamily::Filter) {
            if let Some(conditions) = params.get_mut("conditions").and_then(Value::as_object_mut) {
                if !conditions.get("options").is_some_and(Value::is_object) {
                    conditions.insert(
                        "options".to_string(),
                        json!({"caseSensitive": true, "leftValue": "", "typeValidation": "strict"}),
                    );
                    context.applied(format!("Added condition options to node '{}'", name));
                }
                if !conditions.get("combinator").is_some_and(Value::is_string) {
                    conditions.insert("combinator".to_string(), json!("and"));
                    context.applied(format!("Added condition combinator to node '{}'", name));
                }
            }
        }

        if family == NodeFamily::ScheduleTrigger && !params.contains_key("rule") {
            params.insert("rule".to_string(), json!({"interval": [{"field": "days"}]}));
            context.applied(format!("Added default schedule rule to node '{}'", name));
        }
    }

    document
}
