//! Publishing export files.
//!
//! Files are uploaded one at a time into a resolved folder. A local file
//! is removed only once the storage service has returned an id for it;
//! the first failed upload stops the rest.

use tally_core::{CoreError, ExportFile, RemoteFile, RemoteFolder, RemoteStorage};
use tracing::{error, info, instrument, warn};

use crate::folders::resolve_path;

/// A file the storage service accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// File name in storage.
    pub name: String,
    /// Storage object id.
    pub id: String,
    /// Whether the local copy was removed.
    pub local_deleted: bool,
}

/// The upload that stopped a publish.
#[derive(Debug)]
pub struct UploadFailure {
    /// File that could not be uploaded.
    pub file: ExportFile,
    /// Why.
    pub error: CoreError,
}

/// Result of publishing a batch of files.
#[derive(Debug)]
pub struct PublishReport {
    /// Destination folder.
    pub folder: RemoteFolder,
    /// Files uploaded, in order.
    pub uploaded: Vec<UploadedFile>,
    /// The first failed upload, if any.
    pub failure: Option<UploadFailure>,
    /// Files after the failure that were not tried.
    pub not_attempted: Vec<ExportFile>,
}

impl PublishReport {
    /// Returns true if every file was uploaded.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Converts a failed report into its error.
    pub fn into_result(self) -> Result<Vec<UploadedFile>, CoreError> {
        match self.failure {
            None => Ok(self.uploaded),
            Some(failure) => Err(failure.error),
        }
    }
}

/// Uploads `content` as `name`, replacing an existing file of that name.
pub async fn upsert_bytes<S: RemoteStorage>(
    storage: &S,
    folder_id: &str,
    name: &str,
    mime_type: &str,
    content: Vec<u8>,
) -> Result<RemoteFile, CoreError> {
    let existing = storage.find_file(folder_id, name).await?;
    storage
        .upload_file(
            folder_id,
            name,
            mime_type,
            content,
            existing.as_ref().map(|f| f.id.as_str()),
        )
        .await
}

/// Uploads `files` into the folder at `path` below `root_id`.
///
/// Folder resolution failures are returned as errors before any upload.
/// Upload failures are reported in the [`PublishReport`].
#[instrument(skip(storage, files), fields(files = files.len()))]
pub async fn publish<S: RemoteStorage>(
    storage: &S,
    root_id: &str,
    path: &[String],
    files: Vec<ExportFile>,
    mime_type: &str,
) -> Result<PublishReport, CoreError> {
    let folder = resolve_path(storage, root_id, path).await?;
    let mut report = PublishReport {
        folder,
        uploaded: Vec::new(),
        failure: None,
        not_attempted: Vec::new(),
    };

    let mut pending = files.into_iter();
    for file in pending.by_ref() {
        match upload_one(storage, &report.folder.id, &file, mime_type).await {
            Ok(remote) => {
                let local_deleted = remove_local(&file).await;
                info!(name = %remote.name, id = %remote.id, "Uploaded");
                report.uploaded.push(UploadedFile {
                    name: remote.name,
                    id: remote.id,
                    local_deleted,
                });
            }
            Err(e) => {
                error!(file = %file.path.display(), error = %e, "Upload failed, stopping");
                report.failure = Some(UploadFailure { file, error: e });
                break;
            }
        }
    }
    report.not_attempted = pending.collect();

    if !report.not_attempted.is_empty() {
        warn!(
            count = report.not_attempted.len(),
            "Files left on disk after failed upload"
        );
    }
    Ok(report)
}

async fn upload_one<S: RemoteStorage>(
    storage: &S,
    folder_id: &str,
    file: &ExportFile,
    mime_type: &str,
) -> Result<RemoteFile, CoreError> {
    let name = file.file_name();
    let content = tokio::fs::read(&file.path).await?;
    upsert_bytes(storage, folder_id, &name, mime_type, content).await
}

async fn remove_local(file: &ExportFile) -> bool {
    match tokio::fs::remove_file(&file.path).await {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %file.path.display(), error = %e, "Could not delete local file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InjectedFailure, MemoryStorage};
    use std::path::Path;
    use tally_core::{CSV_MIME_TYPE, YearMonth};

    fn export(dir: &Path, name: &str) -> ExportFile {
        let path = dir.join(name);
        std::fs::write(&path, format!("tool_name\n{name}\n")).unwrap();
        ExportFile {
            path,
            group: Some(name.to_string()),
            period: YearMonth::new(2025, 10).unwrap(),
            record_count: 1,
        }
    }

    fn usage_path() -> Vec<String> {
        vec!["2025".to_string(), "Usage_Data".to_string()]
    }

    #[tokio::test]
    async fn test_publish_deletes_local_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new("root");
        let files = vec![export(dir.path(), "a_2025_10.csv"), export(dir.path(), "b_2025_10.csv")];

        let report = publish(&storage, "root", &usage_path(), files.clone(), CSV_MIME_TYPE)
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.uploaded.len(), 2);
        assert!(report.uploaded.iter().all(|u| u.local_deleted));
        for file in &files {
            assert!(!file.path.exists());
        }
        assert_eq!(
            storage.file_names(&report.folder.id),
            vec!["a_2025_10.csv", "b_2025_10.csv"]
        );
    }

    #[tokio::test]
    async fn test_publish_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new("root");
        storage.fail_upload(2, InjectedFailure::Rejected);
        let files: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|n| export(dir.path(), &format!("{n}_2025_10.csv")))
            .collect();

        let report = publish(&storage, "root", &usage_path(), files.clone(), CSV_MIME_TYPE)
            .await
            .unwrap();

        assert_eq!(report.uploaded.len(), 1);
        assert!(!files[0].path.exists());
        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.file.path, files[1].path);
        assert!(matches!(failure.error, CoreError::Upload { .. }));
        assert_eq!(report.not_attempted.len(), 2);
        for file in &files[1..] {
            assert!(file.path.exists());
        }
        assert_eq!(storage.upload_calls(), 2);
    }

    #[tokio::test]
    async fn test_republish_replaces_instead_of_duplicating() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new("root");
        let first = export(dir.path(), "a_2025_10.csv");
        publish(&storage, "root", &usage_path(), vec![first], CSV_MIME_TYPE)
            .await
            .unwrap();

        std::fs::write(dir.path().join("a_2025_10.csv"), "tool_name\nnewer\n").unwrap();
        let again = ExportFile {
            path: dir.path().join("a_2025_10.csv"),
            group: None,
            period: YearMonth::new(2025, 10).unwrap(),
            record_count: 1,
        };
        let report = publish(&storage, "root", &usage_path(), vec![again], CSV_MIME_TYPE)
            .await
            .unwrap();

        assert_eq!(storage.file_names(&report.folder.id), vec!["a_2025_10.csv"]);
        assert_eq!(
            storage.content(&report.folder.id, "a_2025_10.csv").unwrap(),
            b"tool_name\nnewer\n"
        );
    }

    #[tokio::test]
    async fn test_publish_missing_local_file_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let storage = MemoryStorage::new("root");
        let missing = ExportFile {
            path: dir.path().join("gone_2025_10.csv"),
            group: None,
            period: YearMonth::new(2025, 10).unwrap(),
            record_count: 0,
        };
        let report = publish(&storage, "root", &usage_path(), vec![missing], CSV_MIME_TYPE)
            .await
            .unwrap();
        assert!(matches!(report.failure.unwrap().error, CoreError::Io(_)));
        assert_eq!(storage.upload_calls(), 0);
    }

    #[tokio::test]
    async fn test_upsert_bytes_creates_then_updates() {
        let storage = MemoryStorage::new("root");
        let created = upsert_bytes(&storage, "root", "m.csv", CSV_MIME_TYPE, b"1".to_vec())
            .await
            .unwrap();
        let updated = upsert_bytes(&storage, "root", "m.csv", CSV_MIME_TYPE, b"2".to_vec())
            .await
            .unwrap();
        assert_eq!(created.id, updated.id);
        assert_eq!(storage.content("root", "m.csv").unwrap(), b"2");
    }
}
