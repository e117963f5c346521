//! Expression template syntax
//!
//! The engine evaluates parameter strings that start with `=` and embeds
//! code in `{{ ... }}` blocks. Generated documents mix several historical
//! spellings; [`canonicalize`] maps them to one form.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Parameter keys holding program source; their contents are never rewritten
pub const CODE_FIELDS: &[&str] = &["jsCode", "pythonCode", "functionCode", "code"];

static NODE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\$node\[\s*["']([^"'\]]+)["']\s*\]\.json"#).unwrap());
static JSON_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\$json\[\s*["']([A-Za-z_$][A-Za-z0-9_$]*)["']\s*\]"#).unwrap()
});
static BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{\{\s*(.*?)\s*\}\}").unwrap());

pub fn is_code_field(key: &str) -> bool {
    CODE_FIELDS.contains(&key)
}

/// Whether the string embeds an expression block
pub fn has_template(value: &str) -> bool {
    value.contains("{{")
}

/// Rewrite an expression string to canonical form; plain strings are returned as-is
pub fn canonicalize(value: &str) -> Cow<'_, str> {
    if !has_template(value) {
        return Cow::Borrowed(value);
    }

    let rewritten = NODE_REFERENCE.replace_all(value, |caps: &Captures| {
        format!("$('{}').item.json", &caps[1])
    });
    let rewritten = JSON_INDEX.replace_all(&rewritten, |caps: &Captures| {
        format!("$json.{}", &caps[1])
    });
    let rewritten = BLOCK.replace_all(&rewritten, |caps: &Captures| {
        if caps[1].is_empty() {
            "{{ }}".to_string()
        } else {
            format!("{{{{ {} }}}}", &caps[1])
        }
    });

    let canonical = if rewritten.starts_with('=') {
        rewritten.into_owned()
    } else {
        format!("={}", rewritten)
    };

    if canonical == value {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(canonical)
    }
}

/// Whether the string uses a non-canonical template spelling
pub fn is_legacy(value: &str) -> bool {
    matches!(canonicalize(value), Cow::Owned(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_prefix_and_spacing() {
        assert_eq!(canonicalize("{{$json.name}}"), "={{ $json.name }}");
        assert_eq!(canonicalize("Hi {{ $json.name }}!"), "=Hi {{ $json.name }}!");
    }

    #[test]
    fn test_rewrites_node_reference() {
        assert_eq!(
            canonicalize(r#"={{ $node["Fetch Data"].json.id }}"#),
            "={{ $('Fetch Data').item.json.id }}"
        );
    }

    #[test]
    fn test_rewrites_json_index() {
        assert_eq!(canonicalize(r#"={{ $json["email"] }}"#), "={{ $json.email }}");
        assert_eq!(
            canonicalize(r#"={{ $json["first name"] }}"#),
            r#"={{ $json["first name"] }}"#
        );
    }

    #[test]
    fn test_plain_and_canonical_strings_untouched() {
        assert!(matches!(canonicalize("hello"), Cow::Borrowed(_)));
        assert!(matches!(canonicalize("={{ $json.a }}"), Cow::Borrowed(_)));
        assert!(!is_legacy("={{ $json.a }}"));
        assert!(is_legacy("{{ $json.a }}"));
    }

    #[test]
    fn test_canonicalize_is_stable() {
        let once = canonicalize(r#"{{   $node['A'].json["x"]   }}"#).into_owned();
        assert_eq!(canonicalize(&once), once.as_str());
    }
}
