//! Record validation, enrichment and column cleanup.

use serde_json::Value;
use tally_core::{Dataset, Record, ReferenceTables, UNKNOWN_EMAIL, UNKNOWN_TOOL, UNKNOWN_USER};
use tracing::debug;

use crate::json_fields::flatten_field;

/// Records ready for serialisation, with the number dropped on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prepared {
    /// Records that passed validation, in encounter order.
    pub records: Vec<Record>,
    /// Records dropped for missing required fields.
    pub dropped: usize,
}

/// Validates, enriches and cleans the records of `dataset`.
pub fn prepare(dataset: Dataset, records: Vec<Record>, tables: &ReferenceTables) -> Prepared {
    let required = dataset.required_fields();
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        if let Err(e) = required.check(&record) {
            dropped += 1;
            debug!(id = ?record.id(), error = %e, "Dropping record");
            continue;
        }

        let record = if dataset.needs_lookups() {
            enrich(record, tables)
        } else {
            record
        };
        kept.push(clean(dataset, record));
    }

    Prepared {
        records: kept,
        dropped,
    }
}

/// Adds human-readable tool and user columns.
///
/// Each table is only applied when it has entries.
pub fn enrich(record: Record, tables: &ReferenceTables) -> Record {
    let tool_name = (!tables.tools.is_empty()).then(|| {
        record
            .text("tool")
            .and_then(|id| tables.tool_name(&id).map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_TOOL.to_string())
    });
    let user = (!tables.users.is_empty()).then(|| {
        record
            .text("user")
            .and_then(|id| tables.user(&id).cloned())
    });

    record.map_attributes(|attrs| {
        if let Some(name) = tool_name {
            attrs.insert("tool_name".into(), Value::String(name));
        }
        if let Some(user) = user {
            let (username, full_name, email) = match user {
                Some(u) => (u.username, u.full_name, u.email),
                None => (
                    UNKNOWN_USER.to_string(),
                    UNKNOWN_USER.to_string(),
                    UNKNOWN_EMAIL.to_string(),
                ),
            };
            attrs.insert("user_username".into(), Value::String(username));
            attrs.insert("user_full_name".into(), Value::String(full_name));
            attrs.insert("user_email".into(), Value::String(email));
        }
    })
}

/// Removes the dataset's dropped columns and flattens JSON fields.
pub fn clean(dataset: Dataset, record: Record) -> Record {
    record.map_attributes(|attrs| {
        for column in dataset.dropped_columns() {
            attrs.remove(*column);
        }
        for field in dataset.json_text_fields() {
            if let Some(value) = attrs.get_mut(*field) {
                *value = flatten_field(value);
            }
        }
    })
}
