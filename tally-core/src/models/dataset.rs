//! Export datasets.
//!
//! Each [`Dataset`] describes one remote endpoint and how its records are
//! validated, grouped, named and placed in storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::record::{Record, RecordSchema};
use crate::error::CoreError;

/// Fields a record must carry to be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredFields {
    /// Every listed field must be non-empty.
    All(&'static [&'static str]),
    /// At least one listed field must be non-empty.
    Any(&'static [&'static str]),
}

impl RequiredFields {
    /// Returns the first problem with `record`, if any.
    pub fn check(&self, record: &Record) -> Result<(), CoreError> {
        match self {
            RequiredFields::All(fields) => {
                if let Some(missing) = fields.iter().find(|f| !record.has_value(f)) {
                    return Err(CoreError::InvalidData(format!("missing field {missing}")));
                }
                Ok(())
            }
            RequiredFields::Any(fields) => {
                if fields.iter().any(|f| record.has_value(f)) {
                    Ok(())
                } else {
                    Err(CoreError::InvalidData(format!(
                        "none of {} present",
                        fields.join(", ")
                    )))
                }
            }
        }
    }
}

/// A kind of export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// Billing line items, one file per month.
    Billing,
    /// Tool usage events, one file per tool per month.
    Usage,
}

impl Dataset {
    /// All datasets, in the order `all` runs them.
    pub const ALL: [Dataset; 2] = [Dataset::Billing, Dataset::Usage];

    /// CLI name.
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Billing => "billing",
            Dataset::Usage => "usage",
        }
    }

    /// API path relative to the base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Dataset::Billing => "api/billing/billing_data/",
            Dataset::Usage => "api/usage_events/",
        }
    }

    /// Filename descriptor derived from the endpoint's last path segment.
    pub fn descriptor(&self) -> String {
        self.endpoint()
            .split('/')
            .filter(|p| !p.is_empty())
            .next_back()
            .map_or_else(|| "data".to_string(), |p| p.replace('-', "_"))
    }

    /// Whether the endpoint accepts `start`/`end` query parameters.
    pub fn sends_date_params(&self) -> bool {
        matches!(self, Dataset::Billing)
    }

    /// How raw objects are identified and timestamped.
    pub fn schema(&self) -> RecordSchema {
        match self {
            Dataset::Billing => RecordSchema {
                id_field: "item_id",
                timestamp_field: "start",
            },
            Dataset::Usage => RecordSchema {
                id_field: "id",
                timestamp_field: "start",
            },
        }
    }

    /// Attribute files are split by, if any.
    pub fn group_field(&self) -> Option<&'static str> {
        match self {
            Dataset::Billing => None,
            Dataset::Usage => Some("tool_name"),
        }
    }

    /// Fields a record needs to be exported.
    pub fn required_fields(&self) -> RequiredFields {
        match self {
            Dataset::Billing => RequiredFields::All(&["start"]),
            Dataset::Usage => RequiredFields::Any(&["pre_run_data", "run_data"]),
        }
    }

    /// Whether fetches are limited to the most recent records.
    pub fn is_capped(&self) -> bool {
        matches!(self, Dataset::Usage)
    }

    /// Whether records are enriched from the tool/user reference tables.
    pub fn needs_lookups(&self) -> bool {
        matches!(self, Dataset::Usage)
    }

    /// Columns removed before serialisation.
    pub fn dropped_columns(&self) -> &'static [&'static str] {
        match self {
            Dataset::Billing => &[],
            Dataset::Usage => &[
                "validated",
                "remote_work",
                "training",
                "validated_by",
                "waived_by",
                "id",
                "user",
                "tool",
                "has_ended",
                "waived",
                "waived_on",
                "operator",
                "project",
            ],
        }
    }

    /// Attributes holding JSON documents that are flattened to text.
    pub fn json_text_fields(&self) -> &'static [&'static str] {
        match self {
            Dataset::Billing => &[],
            Dataset::Usage => &["pre_run_data", "run_data"],
        }
    }

    /// Columns placed first, in this order, when present.
    pub fn leading_columns(&self) -> &'static [&'static str] {
        match self {
            Dataset::Billing => &[
                "item_id", "item_type", "start", "end", "user", "tool", "name", "amount",
                "quantity",
            ],
            Dataset::Usage => &[
                "tool_name",
                "start",
                "end",
                "user_username",
                "user_full_name",
                "user_email",
                "pre_run_data",
                "run_data",
            ],
        }
    }

    /// Name of the per-year folder the monthly files go into.
    pub fn folder_leaf(&self) -> &'static str {
        match self {
            Dataset::Billing => "Billing_Data",
            Dataset::Usage => "Usage_Data",
        }
    }

    /// Folder path under the storage root for files of `year`.
    pub fn folder_path(&self, year: i32) -> Vec<String> {
        vec![year.to_string(), self.folder_leaf().to_string()]
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "billing" | "billing_data" => Ok(Dataset::Billing),
            "usage" | "usage_events" => Ok(Dataset::Usage),
            other => Err(CoreError::Configuration(format!("unknown dataset: {other}"))),
        }
    }
}
