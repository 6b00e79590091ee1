//! Grouping of records into export files.

use std::collections::HashMap;

use tally_core::{Dataset, Record, YearMonth, render_cell};
use tracing::warn;

/// Fallback name for records without a group value.
pub const UNGROUPED_NAME: &str = "Unknown";

/// Records destined for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Group value as found on the first record, `None` when ungrouped.
    pub key: Option<String>,
    /// Filename stem derived from the key.
    pub stem: String,
    /// Records in encounter order.
    pub records: Vec<Record>,
}

/// Splits records by the dataset's grouping field.
///
/// Groups appear in the order their first record was encountered, and
/// records keep their order within each group. Values that sanitise to
/// the same stem share a file. Without a grouping field a single group
/// named by the dataset descriptor is returned; no records yields no
/// groups.
pub fn partition(dataset: Dataset, records: Vec<Record>) -> Vec<Group> {
    if records.is_empty() {
        return Vec::new();
    }

    let Some(field) = dataset.group_field() else {
        return vec![Group {
            key: None,
            stem: dataset.descriptor(),
            records,
        }];
    };

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = record
            .get(field)
            .map(render_cell)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNGROUPED_NAME.to_string());
        let stem = sanitize_name(&key);

        if let Some(&i) = index.get(&stem) {
            if groups[i].key.as_deref() != Some(key.as_str()) {
                warn!(first = ?groups[i].key, other = %key, stem = %stem, "Group names collide after sanitising");
            }
            groups[i].records.push(record);
        } else {
            index.insert(stem.clone(), groups.len());
            groups.push(Group {
                key: Some(key),
                stem,
                records: vec![record],
            });
        }
    }

    groups
}

/// Makes a group value safe for use in a filename.
///
/// Keeps alphanumerics, space, `-` and `_`, trims trailing whitespace and
/// turns spaces into underscores.
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let stem = kept.trim_end().replace(' ', "_");
    if stem.is_empty() {
        UNGROUPED_NAME.to_string()
    } else {
        stem
    }
}

/// File name for a group stem and period: `<stem>_<year>_<MM>.csv`.
pub fn file_name(stem: &str, period: YearMonth) -> String {
    format!("{stem}_{}_{:02}.csv", period.year, period.month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn usage(id: u64, tool: &str) -> Record {
        Record::from_raw(
            json!({"id": id, "start": "2025-10-01T10:00:00Z", "tool_name": tool})
                .as_object()
                .cloned()
                .unwrap(),
            &Dataset::Usage.schema(),
        )
        .unwrap()
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Zeiss SEM"), "Zeiss_SEM");
        assert_eq!(sanitize_name("AJA Sputter #2 (Lab B) "), "AJA_Sputter_2_Lab_B");
        assert_eq!(sanitize_name("e-beam_writer"), "e-beam_writer");
        assert_eq!(sanitize_name("???"), UNGROUPED_NAME);
    }

    #[test]
    fn test_file_name() {
        let period = YearMonth::new(2025, 3).unwrap();
        assert_eq!(file_name("Zeiss_SEM", period), "Zeiss_SEM_2025_03.csv");
        assert_eq!(file_name("billing_data", period), "billing_data_2025_03.csv");
    }

    #[test]
    fn test_partition_preserves_encounter_order() {
        let groups = partition(
            Dataset::Usage,
            vec![usage(1, "B"), usage(2, "A"), usage(3, "B"), usage(4, "A"), usage(5, "C")],
        );
        let stems: Vec<_> = groups.iter().map(|g| g.stem.as_str()).collect();
        assert_eq!(stems, vec!["B", "A", "C"]);
        let b_ids: Vec<_> = groups[0].records.iter().filter_map(Record::id).collect();
        assert_eq!(b_ids, vec!["1", "3"]);
    }

    #[test]
    fn test_partition_merges_colliding_stems() {
        let groups = partition(Dataset::Usage, vec![usage(1, "Tool A"), usage(2, "Tool A!")]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key.as_deref(), Some("Tool A"));
        assert_eq!(groups[0].records.len(), 2);
    }

    #[test]
    fn test_partition_without_grouping() {
        let record = Record::from_raw(
            json!({"item_id": 1, "start": "2025-10-01T10:00:00Z"})
                .as_object()
                .cloned()
                .unwrap(),
            &Dataset::Billing.schema(),
        )
        .unwrap();
        let groups = partition(Dataset::Billing, vec![record]);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].key.is_none());
        assert_eq!(groups[0].stem, "billing_data");
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(Dataset::Usage, Vec::new()).is_empty());
    }
}
