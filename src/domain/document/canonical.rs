//! Canonical serialization and content hashing
//!
//! Object keys are emitted in sorted order with no insignificant whitespace,
//! so two documents that differ only in key insertion order or formatting
//! hash to the same value.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Serialize a JSON value with sorted keys and no whitespace
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// SHA-256 of the canonical serialization, hex encoded
pub fn content_hash(value: &Value) -> String {
    let digest = Sha256::digest(canonical_json(value).as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_keys() {
        let value = json!({"b": 1, "a": {"d": [1, 2], "c": null}});
        assert_eq!(canonical_json(&value), r#"{"a":{"c":null,"d":[1,2]},"b":1}"#);
    }

    #[test]
    fn test_hash_ignores_key_order_and_whitespace() {
        let first: Value =
            serde_json::from_str(r#"{"name": "x", "nodes": [], "connections": {}}"#).unwrap();
        let second: Value =
            serde_json::from_str("{\n  \"connections\":{},\"nodes\":[ ],\n\"name\":\"x\"}").unwrap();

        assert_eq!(content_hash(&first), content_hash(&second));
    }

    #[test]
    fn test_hash_detects_content_change() {
        let first = json!({"name": "x"});
        let second = json!({"name": "y"});
        assert_ne!(content_hash(&first), content_hash(&second));
    }

    #[test]
    fn test_array_order_is_significant() {
        assert_ne!(content_hash(&json!([1, 2])), content_hash(&json!([2, 1])));
    }

    #[test]
    fn test_hash_is_hex_sha256() {
        let hash = content_hash(&json!({}));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
