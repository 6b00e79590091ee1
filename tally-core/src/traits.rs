//! Trait definitions for Tally.
//!
//! These are the seams between the pipeline phases: a [`RecordSource`]
//! supplies records, a [`ReferenceSource`] supplies lookup tables, and a
//! [`RemoteStorage`] receives the export files.

use std::future::Future;

use crate::error::CoreError;
use crate::models::{Dataset, DateRange, FetchOutcome, ReferenceTables, RemoteFile, RemoteFolder};

/// Source of records for a dataset and date range.
pub trait RecordSource: Send + Sync {
    /// Fetches every record of `dataset` whose timestamp lies in `range`.
    ///
    /// Implementations follow pagination to the end and perform no
    /// retries. An empty outcome is a success.
    fn fetch_range(
        &self,
        dataset: Dataset,
        range: &DateRange,
    ) -> impl Future<Output = Result<FetchOutcome, CoreError>> + Send;
}

/// Source of the tool and user reference tables.
pub trait ReferenceSource: Send + Sync {
    /// Fetches fresh reference tables.
    fn fetch_reference(&self) -> impl Future<Output = Result<ReferenceTables, CoreError>> + Send;
}

/// Folder-structured remote storage.
///
/// Objects are addressed by exact name under a parent folder id.
pub trait RemoteStorage: Send + Sync {
    /// Looks up a folder by exact name under `parent_id`.
    fn find_folder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<RemoteFolder>, CoreError>> + Send;

    /// Creates a folder under `parent_id`.
    fn create_folder(
        &self,
        parent_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<RemoteFolder, CoreError>> + Send;

    /// Looks up a non-folder object by exact name under `parent_id`.
    fn find_file(
        &self,
        parent_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<RemoteFile>, CoreError>> + Send;

    /// Uploads `content` as `name` under `parent_id`.
    ///
    /// When `existing_id` is given the object's content is replaced
    /// instead of a new object being created. The returned file carries
    /// the id the storage service confirmed.
    fn upload_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
        existing_id: Option<&str>,
    ) -> impl Future<Output = Result<RemoteFile, CoreError>> + Send;

    /// Downloads the content of a file.
    fn download_file(&self, file_id: &str) -> impl Future<Output = Result<Vec<u8>, CoreError>> + Send;

    /// Lists the direct children of a folder.
    fn list_children(
        &self,
        parent_id: &str,
    ) -> impl Future<Output = Result<Vec<RemoteFile>, CoreError>> + Send;
}
