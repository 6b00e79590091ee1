//! Response body parsing.
//!
//! The API answers either with a bare JSON array or with a paginated
//! envelope `{ "count", "next", "previous", "results" }`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tally_core::{Record, RecordSchema, UserInfo, render_cell};
use tracing::debug;

use crate::error::FetchError;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Raw items on this page.
    pub items: Vec<Value>,
    /// Absolute URL of the next page, if any.
    pub next: Option<String>,
}

/// Parses a response body into a page.
pub fn parse_page(body: Value) -> Result<Page, FetchError> {
    match body {
        Value::Array(items) => Ok(Page { items, next: None }),
        Value::Object(mut obj) => {
            let items = match obj.remove("results") {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(FetchError::InvalidResponse(format!(
                        "results is not an array: {}",
                        type_name(&other)
                    )));
                }
                None => {
                    return Err(FetchError::InvalidResponse(
                        "object response without results".to_string(),
                    ));
                }
            };
            let next = match obj.remove("next") {
                Some(Value::String(url)) if !url.is_empty() => Some(url),
                _ => None,
            };
            Ok(Page { items, next })
        }
        other => Err(FetchError::InvalidResponse(format!(
            "expected array or object, got {}",
            type_name(&other)
        ))),
    }
}

/// Converts raw items into records, returning the records and the number
/// of items that were dropped.
pub fn parse_records(items: Vec<Value>, schema: &RecordSchema) -> (Vec<Record>, usize) {
    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0;

    for item in items {
        let Value::Object(raw) = item else {
            dropped += 1;
            debug!("Dropping non-object item");
            continue;
        };
        match Record::from_raw(raw, schema) {
            Ok(record) => records.push(record),
            Err(e) => {
                dropped += 1;
                debug!(error = %e, "Dropping unparseable record");
            }
        }
    }

    (records, dropped)
}

/// Builds the tool table from `api/tools/` items.
pub fn parse_tools(items: &[Value]) -> BTreeMap<String, String> {
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| Some((field(obj, "id")?, field(obj, "name")?)))
        .collect()
}

/// Builds the user table from `api/users/` items.
pub fn parse_users(items: &[Value]) -> BTreeMap<String, UserInfo> {
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            let id = field(obj, "id")?;
            let first = field(obj, "first_name").unwrap_or_default();
            let last = field(obj, "last_name").unwrap_or_default();
            let info = UserInfo {
                username: field(obj, "username").unwrap_or_default(),
                full_name: format!("{first} {last}").trim().to_string(),
                email: field(obj, "email").unwrap_or_default(),
            };
            Some((id, info))
        })
        .collect()
}

fn field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let text = render_cell(obj.get(key)?);
    (!text.is_empty()).then_some(text)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: RecordSchema = RecordSchema {
        id_field: "id",
        timestamp_field: "start",
    };

    #[test]
    fn test_parse_bare_array() {
        let page = parse_page(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next.is_none());
    }

    #[test]
    fn test_parse_envelope_with_next() {
        let page = parse_page(json!({
            "count": 3,
            "next": "https://api.test/api/usage_events/?page=2",
            "previous": null,
            "results": [{"id": 1}]
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next.as_deref(), Some("https://api.test/api/usage_events/?page=2"));
    }

    #[test]
    fn test_parse_envelope_last_page() {
        let page = parse_page(json!({"count": 1, "next": null, "results": []})).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn test_parse_object_without_results_fails() {
        let err = parse_page(json!({"detail": "Invalid token."})).unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_records_counts_drops() {
        let (records, dropped) = parse_records(
            vec![
                json!({"id": 1, "start": "2025-10-02T10:00:00-07:00"}),
                json!({"id": 2, "start": null}),
                json!("not an object"),
                json!({"id": 3, "start": "2025-10-03T10:00:00-07:00"}),
            ],
            &SCHEMA,
        );
        assert_eq!(records.len(), 2);
        assert_eq!(dropped, 2);
        assert_eq!(records[1].id(), Some("3"));
    }

    #[test]
    fn test_parse_tools_and_users() {
        let tools = parse_tools(&[json!({"id": 5, "name": "Zeiss SEM"}), json!({"id": 6})]);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools["5"], "Zeiss SEM");

        let users = parse_users(&[json!({
            "id": 9,
            "username": "ada",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.edu"
        })]);
        assert_eq!(users["9"].full_name, "Ada Lovelace");
        assert_eq!(users["9"].email, "ada@example.edu");
    }
}
