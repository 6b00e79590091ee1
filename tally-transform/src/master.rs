//! Cumulative master tables.
//!
//! A master holds every billing row exported so far. Refreshing it
//! replaces the trailing window with freshly fetched rows.

use chrono::NaiveDate;
use tally_core::parse_timestamp;
use tracing::{debug, info};

use crate::table::Table;

/// Column whose date decides whether an existing row is refreshed.
pub const MASTER_DATE_COLUMN: &str = "start";

/// Days re-fetched on every master refresh.
pub const MASTER_WINDOW_DAYS: i64 = 40;

/// Result of a master merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The merged table.
    pub table: Table,
    /// Existing rows removed because they fall inside the window.
    pub replaced: usize,
    /// Exact duplicate rows removed after appending.
    pub duplicates: usize,
}

/// Merges fresh rows into an existing master.
///
/// Existing rows whose date is on or after `cutoff` are removed; rows
/// with an unparseable date are kept. Fresh rows are appended and exact
/// duplicates dropped. The column order is the existing master's, with
/// columns only the fresh rows have appended at the end.
pub fn merge_rolling(existing: Table, fresh: Table, cutoff: NaiveDate) -> MergeOutcome {
    let mut headers = existing.headers.clone();
    for header in &fresh.headers {
        if !headers.contains(header) {
            headers.push(header.clone());
        }
    }

    let existing = existing.reorder(&headers);
    let fresh = fresh.reorder(&headers);
    let date_idx = existing.column(MASTER_DATE_COLUMN);

    let before = existing.len();
    let mut rows: Vec<Vec<String>> = existing
        .rows
        .into_iter()
        .filter(|row| match date_idx.and_then(|i| row.get(i)).and_then(|s| row_date(s)) {
            Some(date) => date < cutoff,
            None => true,
        })
        .collect();
    let replaced = before - rows.len();
    debug!(replaced, %cutoff, "Removed rows inside refresh window");

    rows.extend(fresh.rows);
    let mut table = Table { headers, rows };
    let duplicates = table.dedupe();

    info!(rows = table.len(), replaced, duplicates, "Merged master table");
    MergeOutcome {
        table,
        replaced,
        duplicates,
    }
}

fn row_date(cell: &str) -> Option<NaiveDate> {
    parse_timestamp(cell)
        .map(|ts| ts.date_naive())
        .or_else(|| NaiveDate::parse_from_str(cell.trim(), "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            headers: headers.iter().map(|s| (*s).to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| (*s).to_string()).collect())
                .collect(),
        }
    }

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 4).unwrap()
    }

    #[test]
    fn test_merge_replaces_window() {
        let existing = table(
            &["item_id", "start", "amount"],
            &[
                &["1", "2025-08-01T09:00:00-07:00", "10"],
                &["2", "2025-09-10T09:00:00-07:00", "20"],
                &["3", "not a date", "30"],
            ],
        );
        let fresh = table(
            &["item_id", "start", "amount"],
            &[&["2", "2025-09-10T09:00:00-07:00", "25"], &["4", "2025-10-01T09:00:00-07:00", "40"]],
        );

        let outcome = merge_rolling(existing, fresh, cutoff());
        let ids: Vec<_> = outcome.table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "2", "4"]);
        assert_eq!(outcome.replaced, 1);
        assert_eq!(outcome.table.rows[2][2], "25");
    }

    #[test]
    fn test_merge_drops_duplicates() {
        let existing = table(&["item_id", "start"], &[&["1", "not a date"]]);
        let fresh = table(&["item_id", "start"], &[&["1", "not a date"], &["5", "2025-09-20"]]);
        let outcome = merge_rolling(existing, fresh, cutoff());
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(outcome.table.len(), 2);
    }

    #[test]
    fn test_merge_aligns_new_columns() {
        let existing = table(&["item_id", "start"], &[&["1", "2025-01-01T00:00:00Z"]]);
        let fresh = table(&["start", "item_id", "quantity"], &[&["2025-09-30T00:00:00Z", "2", "3"]]);
        let outcome = merge_rolling(existing, fresh, cutoff());
        assert_eq!(outcome.table.headers, vec!["item_id", "start", "quantity"]);
        assert_eq!(outcome.table.rows[0], vec!["1", "2025-01-01T00:00:00Z", ""]);
        assert_eq!(outcome.table.rows[1], vec!["2", "2025-09-30T00:00:00Z", "3"]);
    }

    #[test]
    fn test_merge_into_empty_master() {
        let fresh = table(&["item_id", "start"], &[&["1", "2025-09-30T00:00:00Z"]]);
        let outcome = merge_rolling(Table::default(), fresh.clone(), cutoff());
        assert_eq!(outcome.table, fresh);
    }
}
