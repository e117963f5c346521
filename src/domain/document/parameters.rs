//! Typed views over per-family node parameters
//!
//! The document keeps parameters as an opaque JSON bag. This module reads
//! the bag into a tagged union keyed by family so that checks can work with
//! named fields; families without a dedicated shape keep the raw map.

use serde_json::{Map, Value};

use super::family::NodeFamily;

/// Conditional (`if` / `filter`) parameters, either condition shape
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalParams {
    pub conditions: Vec<Value>,
    pub combinator: Option<String>,
    /// Conditions were given in the pre-v2 `{string: [...], number: [...]}` form
    pub legacy_shape: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchParams {
    pub mode: Option<String>,
    pub rules: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetParams {
    pub assignments: Vec<Value>,
    pub legacy_values: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeParams {
    pub language: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpParams {
    pub method: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingPlatform {
    Slack,
    Telegram,
    Discord,
    Email,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessagingParams {
    pub platform: MessagingPlatform,
    /// Channel, chat or recipient the message is addressed to
    pub target: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetParams {
    pub document: Option<String>,
    pub sheet: Option<String>,
    pub operation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleParams {
    pub intervals: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookParams {
    pub path: Option<String>,
    pub http_method: Option<String>,
    pub response_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiParams {
    pub model: Option<String>,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseParams {
    pub respond_with: Option<String>,
}

/// Parameters of a node, tagged by family
#[derive(Debug, Clone, PartialEq)]
pub enum NodeParameters {
    Conditional(ConditionalParams),
    Switch(SwitchParams),
    Set(SetParams),
    Code(CodeParams),
    Http(HttpParams),
    Messaging(MessagingParams),
    Spreadsheet(SpreadsheetParams),
    Schedule(ScheduleParams),
    Webhook(WebhookParams),
    Ai(AiParams),
    Response(ResponseParams),
    /// Known family without a dedicated typed shape
    Other {
        family: NodeFamily,
        params: Map<String, Value>,
    },
    /// Unrecognised family; the bag is carried untouched
    Unknown(Map<String, Value>),
}

impl NodeParameters {
    pub fn parse(family: Option<NodeFamily>, params: &Map<String, Value>) -> Self {
        let Some(family) = family else {
            return Self::Unknown(params.clone());
        };

        match family {
            NodeFamily::If | NodeFamily::Filter => Self::Conditional(parse_conditional(params)),
            NodeFamily::Switch => Self::Switch(SwitchParams {
                mode: string_field(params, "mode"),
                rules: params
                    .get("rules")
                    .and_then(|rules| rules.get("values").or_else(|| rules.get("rules")))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            }),
            NodeFamily::Set => Self::Set(parse_set(params)),
            NodeFamily::Code => Self::Code(parse_code(params)),
            NodeFamily::HttpRequest => Self::Http(HttpParams {
                method: string_field(params, "method")
                    .or_else(|| string_field(params, "requestMethod")),
                url: string_field(params, "url"),
            }),
            NodeFamily::Slack => Self::Messaging(MessagingParams {
                platform: MessagingPlatform::Slack,
                target: locator_field(params, "channelId")
                    .or_else(|| locator_field(params, "channel")),
                text: string_field(params, "text"),
            }),
            NodeFamily::Telegram => Self::Messaging(MessagingParams {
                platform: MessagingPlatform::Telegram,
                target: scalar_field(params, "chatId"),
                text: string_field(params, "text"),
            }),
            NodeFamily::Discord => Self::Messaging(MessagingParams {
                platform: MessagingPlatform::Discord,
                target: locator_field(params, "channelId"),
                text: string_field(params, "content"),
            }),
            NodeFamily::Gmail => Self::Messaging(MessagingParams {
                platform: MessagingPlatform::Email,
                target: string_field(params, "sendTo").or_else(|| string_field(params, "toList")),
                text: string_field(params, "message"),
            }),
            NodeFamily::EmailSend => Self::Messaging(MessagingParams {
                platform: MessagingPlatform::Email,
                target: string_field(params, "toEmail"),
                text: string_field(params, "text").or_else(|| string_field(params, "html")),
            }),
            NodeFamily::GoogleSheets => Self::Spreadsheet(SpreadsheetParams {
                document: locator_field(params, "documentId")
                    .or_else(|| locator_field(params, "sheetId")),
                sheet: locator_field(params, "sheetName"),
                operation: string_field(params, "operation"),
            }),
            NodeFamily::Airtable => Self::Spreadsheet(SpreadsheetParams {
                document: locator_field(params, "base")
                    .or_else(|| locator_field(params, "application")),
                sheet: locator_field(params, "table"),
                operation: string_field(params, "operation"),
            }),
            NodeFamily::ScheduleTrigger => Self::Schedule(ScheduleParams {
                intervals: params
                    .get("rule")
                    .and_then(|rule| rule.get("interval"))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            }),
            NodeFamily::WebhookTrigger => Self::Webhook(WebhookParams {
                path: string_field(params, "path"),
                http_method: string_field(params, "httpMethod"),
                response_mode: string_field(params, "responseMode"),
            }),
            NodeFamily::OpenAi | NodeFamily::LmChatOpenAi => Self::Ai(AiParams {
                model: locator_field(params, "modelId").or_else(|| locator_field(params, "model")),
                prompt: string_field(params, "prompt"),
            }),
            NodeFamily::AiAgent => Self::Ai(AiParams {
                model: None,
                prompt: string_field(params, "text"),
            }),
            NodeFamily::RespondToWebhook => Self::Response(ResponseParams {
                respond_with: string_field(params, "respondWith"),
            }),
            family => Self::Other {
                family,
                params: params.clone(),
            },
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

fn parse_conditional(params: &Map<String, Value>) -> ConditionalParams {
    let Some(conditions) = params.get("conditions") else {
        return ConditionalParams {
            conditions: Vec::new(),
            combinator: None,
            legacy_shape: false,
        };
    };

    if let Some(list) = conditions.get("conditions").and_then(Value::as_array) {
        return ConditionalParams {
            conditions: list.clone(),
            combinator: conditions
                .get("combinator")
                .and_then(Value::as_str)
                .map(str::to_string),
            legacy_shape: false,
        };
    }

    let mut legacy = Vec::new();
    let mut legacy_shape = false;

    if let Some(map) = conditions.as_object() {
        for key in ["string", "number", "boolean", "dateTime"] {
            if let Some(list) = map.get(key).and_then(Value::as_array) {
                legacy_shape = true;
                legacy.extend(list.iter().cloned());
            }
        }
    }

    ConditionalParams {
        conditions: legacy,
        combinator: string_field(params, "combineOperation"),
        legacy_shape,
    }
}

fn parse_set(params: &Map<String, Value>) -> SetParams {
    if let Some(list) = params
        .get("assignments")
        .and_then(|a| a.get("assignments"))
        .and_then(Value::as_array)
    {
        return SetParams {
            assignments: list.clone(),
            legacy_values: false,
        };
    }

    let mut values = Vec::new();
    let legacy_values = params.get("values").is_some_and(Value::is_object);

    if let Some(map) = params.get("values").and_then(Value::as_object) {
        for list in map.values().filter_map(Value::as_array) {
            values.extend(list.iter().cloned());
        }
    }

    SetParams {
        assignments: values,
        legacy_values,
    }
}

fn parse_code(params: &Map<String, Value>) -> CodeParams {
    let language = string_field(params, "language").unwrap_or_else(|| "javaScript".to_string());
    let code = if language.eq_ignore_ascii_case("python") || language == "pythonNative" {
        string_field(params, "pythonCode")
    } else {
        string_field(params, "jsCode").or_else(|| string_field(params, "functionCode"))
    };

    CodeParams { language, code }
}

fn string_field(params: &Map<String, Value>, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).map(str::to_string)
}

/// String or number, rendered as a string
fn scalar_field(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Plain string or the `value` of a resource-locator object
pub fn locator_field(params: &Map<String, Value>, key: &str) -> Option<String> {
    locator_value(params.get(key)?)
}

pub fn locator_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("value").and_then(locator_value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_unknown_family_keeps_bag() {
        let params = map(json!({"anything": 1}));
        let parsed = NodeParameters::parse(None, &params);
        assert_eq!(parsed, NodeParameters::Unknown(params));
        assert!(parsed.is_unknown());
    }

    #[test]
    fn test_conditional_v2_shape() {
        let params = map(json!({
            "conditions": {
                "combinator": "and",
                "conditions": [{"leftValue": "={{ $json.a }}", "rightValue": 1}]
            }
        }));

        match NodeParameters::parse(Some(NodeFamily::If), &params) {
            NodeParameters::Conditional(c) => {
                assert_eq!(c.conditions.len(), 1);
                assert_eq!(c.combinator.as_deref(), Some("and"));
                assert!(!c.legacy_shape);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_conditional_legacy_shape() {
        let params = map(json!({
            "conditions": {
                "string": [{"value1": "a", "value2": "b"}],
                "number": [{"value1": 1, "operation": "larger", "value2": 2}]
            }
        }));

        match NodeParameters::parse(Some(NodeFamily::If), &params) {
            NodeParameters::Conditional(c) => {
                assert_eq!(c.conditions.len(), 2);
                assert!(c.legacy_shape);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_slack_target_from_locator() {
        let params = map(json!({
            "channelId": {"__rl": true, "value": "#general", "mode": "name"},
            "text": "hi"
        }));

        match NodeParameters::parse(Some(NodeFamily::Slack), &params) {
            NodeParameters::Messaging(m) => {
                assert_eq!(m.platform, MessagingPlatform::Slack);
                assert_eq!(m.target.as_deref(), Some("#general"));
                assert_eq!(m.text.as_deref(), Some("hi"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_telegram_numeric_chat_id() {
        let params = map(json!({"chatId": -100123, "text": "x"}));

        match NodeParameters::parse(Some(NodeFamily::Telegram), &params) {
            NodeParameters::Messaging(m) => assert_eq!(m.target.as_deref(), Some("-100123")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_code_legacy_function_code() {
        let params = map(json!({"functionCode": "return items;"}));

        match NodeParameters::parse(Some(NodeFamily::Code), &params) {
            NodeParameters::Code(c) => {
                assert_eq!(c.language, "javaScript");
                assert_eq!(c.code.as_deref(), Some("return items;"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_family_without_typed_shape() {
        let params = map(json!({"amount": 5}));
        assert!(matches!(
            NodeParameters::parse(Some(NodeFamily::Wait), &params),
            NodeParameters::Other { family: NodeFamily::Wait, .. }
        ));
    }
}
