//! Flattening of JSON-valued attributes into readable text.
//!
//! Run data is stored by the API as JSON documents whose interesting part
//! is a `user_input` object, possibly nested several levels deep. These
//! helpers turn it into `key: value; key: value` text, keys in document
//! order.

use serde_json::{Map, Value};
use tally_core::render_cell;

/// Text used when a document has no `user_input` anywhere.
pub const NO_USER_INPUT: &str = "No user_input found";

/// Text used when `user_input` exists but every value is null.
pub const NO_VALUES: &str = "No values";

/// Text used when the attribute is not valid JSON.
pub const INVALID_JSON: &str = "Invalid JSON";

/// Flattens one attribute value.
///
/// Empty and null values are returned unchanged. Strings are parsed as
/// JSON first; objects are used as-is.
pub fn flatten_field(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) if s.is_empty() => value.clone(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(doc) => Value::String(extract_user_input(&doc)),
            Err(_) => Value::String(INVALID_JSON.to_string()),
        },
        doc => Value::String(extract_user_input(doc)),
    }
}

/// Extracts and formats the `user_input` found in `doc`.
pub fn extract_user_input(doc: &Value) -> String {
    let Value::Object(obj) = doc else {
        return NO_USER_INPUT.to_string();
    };

    if let Some(input) = obj.get("user_input") {
        return match input {
            Value::Object(fields) => format_fields(fields),
            other => render_cell(other),
        };
    }

    let nested: Vec<String> = obj
        .iter()
        .filter(|(_, v)| v.is_object())
        .filter_map(|(key, v)| {
            let inner = extract_user_input(v);
            (inner != NO_USER_INPUT && inner != NO_VALUES && !inner.is_empty())
                .then(|| format!("{key}: {inner}"))
        })
        .collect();

    if nested.is_empty() {
        NO_USER_INPUT.to_string()
    } else {
        nested.join("; ")
    }
}

fn format_fields(fields: &Map<String, Value>) -> String {
    let parts: Vec<String> = fields
        .iter()
        .filter(|(_, v)| !v.is_null())
        .filter_map(|(key, value)| match value {
            Value::Object(group) => {
                let inner: Vec<String> = group
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| format!("{k}: {}", render_cell(v)))
                    .collect();
                (!inner.is_empty()).then(|| format!("{key} ({})", inner.join("; ")))
            }
            other => Some(format!("{key}: {}", render_cell(other))),
        })
        .collect();

    if parts.is_empty() {
        NO_VALUES.to_string()
    } else {
        parts.join("; ")
    }
}
