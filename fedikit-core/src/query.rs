//! Rails-style query strings.
//!
//! The remote service's parameter parser expects the Rack bracket
//! convention: `key=value` for scalars, `key[]=v1&key[]=v2` for arrays and
//! `key[subkey]=value` for nested objects. The brackets must stay literal
//! in the rendered string; only the values are percent-encoded.

use serde_json::Value;
use url::form_urlencoded::byte_serialize;

/// Flatten a structured value into `(bracketed key, scalar value)` pairs,
/// preserving array order. Shared by the query-string and multipart
/// renderers. `Null` values are dropped.
pub fn flatten(data: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Value::Object(map) = data {
        for (key, value) in map {
            walk(key.clone(), value, &mut pairs);
        }
    }
    pairs
}

fn walk(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                walk(format!("{prefix}[]"), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, inner) in map {
                walk(format!("{prefix}[{key}]"), inner, pairs);
            }
        }
        Value::String(s) => pairs.push((prefix, s.clone())),
        Value::Bool(b) => pairs.push((prefix, b.to_string())),
        Value::Number(n) => pairs.push((prefix, n.to_string())),
    }
}

/// Render a structured value as a rails-style query string.
pub fn stringify(data: &Value) -> String {
    flatten(data)
        .into_iter()
        .map(|(key, value)| {
            let encoded: String = byte_serialize(value.as_bytes()).collect();
            format!("{key}={encoded}")
        })
        .collect::<Vec<_>>()
        .join("&")
}
