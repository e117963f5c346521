//! Pull a workflow document out of raw model output
//!
//! Model responses arrive as bare JSON, fenced JSON, or JSON surrounded by
//! prose. Candidates are tried in that order; among brace-delimited spans
//! the first one that looks like a workflow wins.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::document::WorkflowDocument;
use crate::domain::DomainError;

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").unwrap());

/// Balanced `{...}` spans, skipping braces inside string literals
fn object_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut end = None;

        for (i, &byte) in bytes.iter().enumerate().skip(open) {
            if in_string {
                match byte {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }

            match byte {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        match end {
            Some(end) => {
                spans.push(&text[open..=end]);
                start = end + 1;
            }
            None => break,
        }
    }

    spans
}

/// Unwrap `{"workflow": {...}}` envelopes
fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if !map.contains_key("nodes") => match map.remove("workflow") {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                map.insert("workflow".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate.trim())
        .ok()
        .map(unwrap_envelope)
        .filter(Value::is_object)
}

fn looks_like_workflow(value: &Value) -> bool {
    value.get("nodes").is_some_and(Value::is_array)
}

/// Extract the first workflow-shaped JSON object from `text`
pub fn extract_document(text: &str) -> Result<WorkflowDocument, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::parse("Generator returned an empty response"));
    }

    if let Some(value) = parse_object(trimmed) {
        return WorkflowDocument::from_value(value);
    }

    let fenced = FENCED_BLOCK
        .captures_iter(trimmed)
        .filter_map(|caps| caps.get(1))
        .filter_map(|body| parse_object(body.as_str()));

    let mut fallback = None;

    for value in fenced.chain(object_spans(trimmed).into_iter().filter_map(parse_object)) {
        if looks_like_workflow(&value) {
            return WorkflowDocument::from_value(value);
        }
        if fallback.is_none() {
            fallback = Some(value);
        }
    }

    match fallback {
        Some(value) => WorkflowDocument::from_value(value),
        None => Err(DomainError::parse(
            "Generator response did not contain a JSON object",
        )),
    }
}
