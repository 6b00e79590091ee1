//! Fetched usage/billing records.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Which raw attributes identify a record and carry its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    /// Attribute holding the record identifier.
    pub id_field: &'static str,
    /// Attribute holding the event timestamp.
    pub timestamp_field: &'static str,
}

/// One usage/billing event as returned by the remote API.
///
/// Every raw attribute is preserved in `attributes`; the identifier and
/// timestamp are parsed once so that range filtering and truncation do
/// not re-parse them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: Option<String>,
    timestamp: DateTime<FixedOffset>,
    attributes: BTreeMap<String, Value>,
}

impl Record {
    /// Builds a record from a raw JSON object.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidData` if the timestamp attribute is
    /// missing or cannot be parsed.
    pub fn from_raw(raw: Map<String, Value>, schema: &RecordSchema) -> Result<Self, CoreError> {
        let timestamp = match raw.get(schema.timestamp_field) {
            Some(Value::String(s)) => parse_timestamp(s).ok_or_else(|| {
                CoreError::InvalidData(format!(
                    "unparseable {} timestamp: {s:?}",
                    schema.timestamp_field
                ))
            })?,
            Some(other) if !other.is_null() => {
                return Err(CoreError::InvalidData(format!(
                    "{} is not a string: {other}",
                    schema.timestamp_field
                )));
            }
            _ => {
                return Err(CoreError::InvalidData(format!(
                    "missing {} timestamp",
                    schema.timestamp_field
                )));
            }
        };

        let id = raw.get(schema.id_field).and_then(value_text);

        Ok(Self {
            id,
            timestamp,
            attributes: raw.into_iter().collect(),
        })
    }

    /// Record identifier, if the API supplied one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Numeric form of the identifier, used for ordering ties.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_deref().and_then(|s| s.parse().ok())
    }

    /// Event timestamp in the offset the API reported.
    pub fn timestamp(&self) -> &DateTime<FixedOffset> {
        &self.timestamp
    }

    /// All raw attributes.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// A single raw attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Text form of an attribute; `None` when absent, null or empty.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(value_text)
    }

    /// Returns true if the attribute is present and not empty.
    pub fn has_value(&self, key: &str) -> bool {
        self.text(key).is_some()
    }

    /// Returns a copy of the record with its attributes rewritten by `f`.
    ///
    /// The identifier and timestamp are not affected.
    #[must_use]
    pub fn map_attributes(mut self, f: impl FnOnce(&mut BTreeMap<String, Value>)) -> Self {
        f(&mut self.attributes);
        self
    }
}

// ============================================================================
// Value Helpers
// ============================================================================

/// Parses the timestamp formats the API is known to emit.
///
/// RFC 3339 is tried first; naive forms are treated as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    None
}

/// Renders a JSON value as a table cell.
///
/// Strings are verbatim, null is empty, everything else is compact JSON.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_text(value: &Value) -> Option<String> {
    let text = render_cell(value);
    (!text.is_empty()).then_some(text)
}

// ============================================================================
// Tests
// ============================================================================
