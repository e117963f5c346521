//! Expression syntax rewrite

use std::borrow::Cow;

use serde_json::Value;

use super::{node_name, nodes_mut, Document, FixContext};
use crate::domain::document::expression;

/// Rewrite every expression string under `value` to canonical form.
/// Code bodies are left alone. Returns the new value and the rewrite count.
pub fn rewrite_expressions(value: Value) -> (Value, usize) {
    let mut count = 0;
    let value = rewrite(value, &mut count);
    (value, count)
}

fn rewrite(value: Value, count: &mut usize) -> Value {
    match value {
        Value::String(s) => match expression::canonicalize(&s) {
            Cow::Borrowed(_) => Value::String(s),
            Cow::Owned(canonical) => {
                *count += 1;
                Value::String(canonical)
            }
        },
        Value::Array(items) => Value::Array(items.into_iter().map(|v| rewrite(v, count)).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| {
                    if expression::is_code_field(&key) {
                        (key, child)
                    } else {
                        let child = rewrite(child, count);
                        (key, child)
                    }
                })
                .collect(),
        ),
        other => other,
    }
}

pub(super) fn rewrite_document_expressions(
    mut document: Document,
    context: &mut FixContext,
) -> Document {
    let Some(nodes) = nodes_mut(&mut document) else {
        return document;
    };

    for node in nodes.iter_mut() {
        let Some(parameters) = node.get_mut("parameters") else {
            continue;
        };

        let (rewritten, count) = rewrite_expressions(parameters.take());
        *parameters = rewritten;

        if count > 0 {
            let name = node_name(node).unwrap_or("unnamed");
            context.applied(format!("Rewrote {} expression(s) in node '{}'", count, name));
        }
    }

    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_strings_rewritten() {
        let (value, count) = rewrite_expressions(json!({
            "text": "{{$json.a}}",
            "options": {"headers": [{"value": "Bearer {{ $json[\"token\"] }}"}]},
            "plain": "hello",
            "number": 3
        }));

        assert_eq!(count, 2);
        assert_eq!(value["text"], "={{ $json.a }}");
        assert_eq!(value["options"]["headers"][0]["value"], "=Bearer {{ $json.token }}");
        assert_eq!(value["plain"], "hello");
    }

    #[test]
    fn test_code_bodies_untouched() {
        let source = "const x = `{{${a}}}`; return items;";
        let (value, count) = rewrite_expressions(json!({"jsCode": source}));
        assert_eq!(count, 0);
        assert_eq!(value["jsCode"], source);
    }
}
