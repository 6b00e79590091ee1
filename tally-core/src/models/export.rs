//! Pipeline artefacts: fetch results, export files and remote objects.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::range::YearMonth;
use super::record::Record;

/// MIME type the storage API uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type of export files.
pub const CSV_MIME_TYPE: &str = "text/csv";

/// The records fetched for one range, with counts of what was discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Records inside the range, in encounter order.
    pub records: Vec<Record>,
    /// Raw objects dropped because they could not be parsed.
    pub dropped: usize,
    /// Parsed records discarded for falling outside the range.
    pub out_of_range: usize,
    /// In-range count before truncation, when the cap was hit.
    pub truncated_from: Option<usize>,
}

impl FetchOutcome {
    /// Returns true if no record survived.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A locally written file waiting to be published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFile {
    /// Local path of the file.
    pub path: PathBuf,
    /// Grouping key the file was produced for, if the dataset is grouped.
    pub group: Option<String>,
    /// Month the file covers.
    pub period: YearMonth,
    /// Number of data rows.
    pub record_count: usize,
}

impl ExportFile {
    /// File name used both locally and remotely.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A folder in remote storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    /// Storage object id.
    pub id: String,
    /// Exact folder name.
    pub name: String,
}

/// A file or folder listed from remote storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Storage object id.
    pub id: String,
    /// Object name.
    pub name: String,
    /// MIME type reported by the storage API.
    #[serde(default)]
    pub mime_type: String,
    /// Last modification time as reported (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

impl RemoteFile {
    /// Returns true if the object is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

impl From<RemoteFile> for RemoteFolder {
    fn from(file: RemoteFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_path() {
        let file = ExportFile {
            path: PathBuf::from("/tmp/work/Zeiss_SEM_2025_10.csv"),
            group: Some("Zeiss SEM".into()),
            period: YearMonth::new(2025, 10).unwrap(),
            record_count: 3,
        };
        assert_eq!(file.file_name(), "Zeiss_SEM_2025_10.csv");
    }

    #[test]
    fn test_remote_file_from_api_json() {
        let file: RemoteFile = serde_json::from_str(
            r#"{"id":"abc","name":"2025","mimeType":"application/vnd.google-apps.folder"}"#,
        )
        .unwrap();
        assert!(file.is_folder());
        assert!(file.modified_time.is_none());
    }
}
