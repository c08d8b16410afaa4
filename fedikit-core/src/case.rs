//! Key-name transcoding between the caller convention (camelCase) and the
//! wire convention (snake_case).
//!
//! Every outgoing payload is renamed to snake_case and every incoming JSON
//! payload is renamed back, so callers only ever see camelCase keys.

use serde_json::Value;

/// Convert a camelCase (or already snake_case) identifier to snake_case.
///
/// Every uppercase letter starts a new word, so consecutive capitals split
/// too (`"aAA"` becomes `"a_a_a"`); this keeps the pair with
/// [`camel_case`] lossless.
pub fn snake_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);

    for ch in input.chars() {
        if ch.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }

    out
}

/// Convert a snake_case identifier to camelCase.
pub fn camel_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut upper_next = false;

    for ch in input.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }

    out
}

/// Recursively rename every object key in `value` with `rename`.
///
/// Objects nested inside arrays are renamed too; primitive array elements
/// pass through untouched.
pub fn transform_keys(value: Value, rename: fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (rename(&key), transform_keys(inner, rename)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| transform_keys(item, rename))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn snake_cases_camel_identifiers() {
        assert_eq!(snake_case("mediaAttachments"), "media_attachments");
        assert_eq!(snake_case("updateCredentials"), "update_credentials");
        assert_eq!(snake_case("statuses"), "statuses");
        assert_eq!(snake_case("limit"), "limit");
    }

    #[test]
    fn snake_case_is_idempotent() {
        assert_eq!(snake_case("media_attachments"), "media_attachments");
    }

    #[test]
    fn consecutive_capitals_split_into_words() {
        assert_eq!(snake_case("aAA"), "a_a_a");
        assert_eq!(camel_case(&snake_case("aAA")), "aAA");
        assert_eq!(snake_case(&camel_case("a_a_a")), "a_a_a");
    }

    #[test]
    fn camel_cases_snake_identifiers() {
        assert_eq!(camel_case("media_attachments"), "mediaAttachments");
        assert_eq!(camel_case("status"), "status");
    }

    #[test]
    fn transforms_nested_keys() {
        let input = json!({
            "spoilerText": "cw",
            "mediaIds": ["1", "2"],
            "poll": { "expiresIn": 300, "multipleChoice": false },
            "tags": [{ "tagName": "rust" }],
        });

        let out = transform_keys(input, snake_case);

        assert_eq!(
            out,
            json!({
                "spoiler_text": "cw",
                "media_ids": ["1", "2"],
                "poll": { "expires_in": 300, "multiple_choice": false },
                "tags": [{ "tag_name": "rust" }],
            })
        );
    }

    #[test]
    fn leaves_primitive_array_values_alone() {
        let input = json!({ "context": ["homeTimeline", "public"] });
        let out = transform_keys(input, snake_case);
        assert_eq!(out, json!({ "context": ["homeTimeline", "public"] }));
    }

    proptest! {
        #[test]
        fn snake_then_camel_round_trips(key in "[a-z][a-z0-9]{0,8}([A-Z][a-z0-9]{1,8}){0,3}") {
            prop_assert_eq!(camel_case(&snake_case(&key)), key);
        }

        #[test]
        fn camel_then_snake_round_trips(key in "[a-z][a-z0-9]{0,8}(_[a-z][a-z0-9]{0,8}){0,3}") {
            prop_assert_eq!(snake_case(&camel_case(&key)), key);
        }
    }
}
