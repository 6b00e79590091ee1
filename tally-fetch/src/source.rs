//! [`RecordSource`] and [`ReferenceSource`] backed by the lab API.

use std::cmp::Ordering;

use tally_core::{
    CoreError, Dataset, DateRange, FetchOutcome, Record, RecordSource, ReferenceSource,
    ReferenceTables,
};
use tracing::{info, instrument, warn};

use crate::api::LabApi;
use crate::parser::parse_records;

/// Default cap on records kept per fetch.
pub const DEFAULT_MAX_RECORDS: usize = 2000;

/// Record source that fetches from the lab API.
#[derive(Debug, Clone)]
pub struct ApiRecordSource {
    api: LabApi,
    max_records: usize,
}

impl ApiRecordSource {
    /// Creates a source with the default record cap.
    pub fn new(api: LabApi) -> Self {
        Self {
            api,
            max_records: DEFAULT_MAX_RECORDS,
        }
    }

    /// Sets the record cap for capped datasets.
    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// The underlying API client.
    pub fn api(&self) -> &LabApi {
        &self.api
    }
}

impl RecordSource for ApiRecordSource {
    #[instrument(skip(self), fields(dataset = %dataset, range = %range))]
    async fn fetch_range(
        &self,
        dataset: Dataset,
        range: &DateRange,
    ) -> Result<FetchOutcome, CoreError> {
        let items = self.api.fetch_dataset(dataset, range).await?;
        let (records, dropped) = parse_records(items, &dataset.schema());
        if dropped > 0 {
            warn!(dropped, "Dropped records without a usable timestamp");
        }

        let fetched = records.len();
        let in_range: Vec<Record> = records
            .into_iter()
            .filter(|r| range.contains(r.timestamp()))
            .collect();
        let out_of_range = fetched - in_range.len();

        let (records, truncated_from) = if dataset.is_capped() {
            retain_most_recent(in_range, self.max_records)
        } else {
            (in_range, None)
        };
        if let Some(total) = truncated_from {
            info!(
                total,
                kept = records.len(),
                "Limited to the most recent records"
            );
        }

        info!(records = records.len(), out_of_range, "Records in range");
        Ok(FetchOutcome {
            records,
            dropped,
            out_of_range,
            truncated_from,
        })
    }
}

impl ReferenceSource for ApiRecordSource {
    #[instrument(skip(self))]
    async fn fetch_reference(&self) -> Result<ReferenceTables, CoreError> {
        let tools = self.api.fetch_tools().await?;
        let users = self.api.fetch_users().await?;
        info!(tools = tools.len(), users = users.len(), "Fetched reference tables");
        Ok(ReferenceTables { tools, users })
    }
}

// ============================================================================
// Truncation
// ============================================================================

/// Keeps the `cap` most recent records, preserving their encounter order.
///
/// Recency is by timestamp, ties broken by identifier (higher is more
/// recent; records without one rank lowest). Returns the original count
/// when truncation happened.
pub fn retain_most_recent(records: Vec<Record>, cap: usize) -> (Vec<Record>, Option<usize>) {
    let total = records.len();
    if total <= cap {
        return (records, None);
    }

    let mut order: Vec<usize> = (0..total).collect();
    order.sort_by(|&a, &b| recency(&records[b], &records[a]));
    let mut keep = vec![false; total];
    for &idx in order.iter().take(cap) {
        keep[idx] = true;
    }

    let kept = records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect();
    (kept, Some(total))
}

fn recency(a: &Record, b: &Record) -> Ordering {
    a.timestamp()
        .cmp(b.timestamp())
        .then_with(|| match (a.numeric_id(), b.numeric_id()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.id().cmp(&b.id()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: u64, start: &str) -> Record {
        Record::from_raw(
            json!({"id": id, "start": start}).as_object().cloned().unwrap(),
            &Dataset::Usage.schema(),
        )
        .unwrap()
    }

    #[test]
    fn test_retain_under_cap_is_untouched() {
        let records = vec![record(1, "2025-10-01T00:00:00Z")];
        let (kept, truncated) = retain_most_recent(records.clone(), 5);
        assert_eq!(kept, records);
        assert!(truncated.is_none());
    }

    #[test]
    fn test_retain_keeps_latest_in_encounter_order() {
        let records = vec![
            record(1, "2025-10-05T00:00:00Z"),
            record(2, "2025-10-01T00:00:00Z"),
            record(3, "2025-10-09T00:00:00Z"),
            record(4, "2025-10-02T00:00:00Z"),
        ];
        let (kept, truncated) = retain_most_recent(records, 2);
        let ids: Vec<_> = kept.iter().map(|r| r.id().unwrap().to_string()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(truncated, Some(4));
    }

    #[test]
    fn test_retain_breaks_ties_by_id() {
        let records = vec![
            record(10, "2025-10-05T00:00:00Z"),
            record(9, "2025-10-05T00:00:00Z"),
            record(11, "2025-10-05T00:00:00Z"),
        ];
        let (kept, _) = retain_most_recent(records, 2);
        let ids: Vec<_> = kept.iter().map(|r| r.numeric_id().unwrap()).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn test_retain_compares_instants_across_offsets() {
        let records = vec![
            record(1, "2025-10-05T10:00:00-07:00"),
            record(2, "2025-10-05T12:00:00Z"),
        ];
        let (kept, _) = retain_most_recent(records, 1);
        assert_eq!(kept[0].id(), Some("1"));
    }
}
