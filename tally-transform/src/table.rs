//! In-memory CSV tables.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use tally_core::{Dataset, Record, render_cell};

use crate::error::TransformError;

/// A header row plus string cells, the unit written to and read from CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names.
    pub headers: Vec<String>,
    /// Data rows, each as long as `headers`.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from records.
    ///
    /// Columns are the dataset's leading columns that occur in any record,
    /// followed by every other attribute in sorted order.
    pub fn from_records(dataset: Dataset, records: &[Record]) -> Self {
        let mut present: BTreeSet<&str> = BTreeSet::new();
        for record in records {
            present.extend(record.attributes().keys().map(String::as_str));
        }

        let leading = dataset.leading_columns();
        let mut headers: Vec<String> = leading
            .iter()
            .filter(|c| present.contains(*c))
            .map(|c| (*c).to_string())
            .collect();
        headers.extend(
            present
                .iter()
                .filter(|c| !leading.contains(c))
                .map(|c| (*c).to_string()),
        );

        let rows = records
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.get(h).map(render_cell).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { headers, rows }
    }

    /// Parses CSV bytes. Short rows are padded with empty cells.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, TransformError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for row in reader.records() {
            let row = row?;
            if row.len() > headers.len() {
                return Err(TransformError::InvalidTable(format!(
                    "row {} has {} cells for {} columns",
                    rows.len() + 1,
                    row.len(),
                    headers.len()
                )));
            }
            let mut cells: Vec<String> = row.iter().map(str::to_string).collect();
            cells.resize(headers.len(), String::new());
            rows.push(cells);
        }
        Ok(Self { headers, rows })
    }

    /// Serialises the table as CSV.
    pub fn to_csv(&self) -> Result<Vec<u8>, TransformError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| TransformError::InvalidTable(e.to_string()))
    }

    /// Writes the table to `path`, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<(), TransformError> {
        let bytes = self.to_csv()?;
        std::fs::write(path, bytes).map_err(|e| TransformError::io(path, e))
    }

    /// Index of a column.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewrites every row to the given column order; missing columns are
    /// empty.
    #[must_use]
    pub fn reorder(self, headers: &[String]) -> Self {
        let positions: Vec<Option<usize>> = headers.iter().map(|h| self.column(h)).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|p| p.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self {
            headers: headers.to_vec(),
            rows,
        }
    }

    /// Removes exact duplicate rows, keeping the first of each.
    pub fn dedupe(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }
}
