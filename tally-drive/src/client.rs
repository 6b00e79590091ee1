//! REST client for the storage API.
//!
//! Speaks the Drive v3 file API: `files.list` with a `q` query,
//! `files.create` for folders, multipart upload, media update and media
//! download. Every call carries the shared-drive flags.

use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use serde_json::json;
use tally_core::{CoreError, FOLDER_MIME_TYPE, RemoteFile, RemoteFolder, RemoteStorage};
use tracing::{debug, info, instrument};

use crate::auth::TokenProvider;
use crate::error::DriveError;

/// Default storage API base URL.
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

/// Fields requested for every file object.
const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime";

/// Separator for multipart upload bodies.
const MULTIPART_BOUNDARY: &str = "tally-multipart-4f1c9e2b";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
    next_page_token: Option<String>,
}

/// Storage API client.
#[derive(Debug)]
pub struct DriveClient {
    http: Client,
    base: String,
    auth: TokenProvider,
}

impl DriveClient {
    /// Creates a client for the API rooted at `base`.
    pub fn new(http: Client, base: &str, auth: TokenProvider) -> Self {
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn files_url(&self) -> String {
        format!("{}/drive/v3/files", self.base)
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/drive/v3/files", self.base)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DriveError> {
        let token = self.auth.access_token().await?;
        let response = request
            .bearer_auth(token)
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(DriveError::from_request)?;

        let status = response.status();
        debug!(status = %status, "Storage response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = classify_failure(status, body);
        if matches!(err, DriveError::AuthenticationFailed(_)) {
            self.auth.invalidate().await;
        }
        Err(err)
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, DriveError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Parse(e.to_string()))
    }

    /// Runs a `files.list` query, following page tokens.
    #[instrument(skip(self))]
    pub async fn list(&self, q: &str) -> Result<Vec<RemoteFile>, DriveError> {
        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http.get(self.files_url()).query(&[
                ("q", q),
                ("fields", fields.as_str()),
                ("includeItemsFromAllDrives", "true"),
                ("pageSize", "1000"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = self.send_json(request).await?;
            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn find_named(
        &self,
        parent_id: &str,
        name: &str,
        folders: bool,
    ) -> Result<Option<RemoteFile>, DriveError> {
        let op = if folders { "=" } else { "!=" };
        let q = format!(
            "name = '{}' and '{}' in parents and mimeType {op} '{FOLDER_MIME_TYPE}' and trashed = false",
            escape_query(name),
            escape_query(parent_id)
        );
        Ok(self.list(&q).await?.into_iter().next())
    }

    /// Creates a folder.
    #[instrument(skip(self))]
    pub async fn create_folder_raw(&self, parent_id: &str, name: &str) -> Result<RemoteFile, DriveError> {
        let request = self
            .http
            .post(self.files_url())
            .query(&[("fields", FILE_FIELDS)])
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent_id],
            }));
        let folder: RemoteFile = self.send_json(request).await?;
        info!(id = %folder.id, name, "Created folder");
        Ok(folder)
    }

    /// Uploads a new file or replaces an existing file's content.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn upload_raw(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
        existing_id: Option<&str>,
    ) -> Result<RemoteFile, DriveError> {
        let request = match existing_id {
            Some(id) => self
                .http
                .patch(format!("{}/{id}", self.upload_url()))
                .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
                .header(header::CONTENT_TYPE, mime_type)
                .body(content),
            None => {
                let metadata = json!({"name": name, "parents": [parent_id]});
                self.http
                    .post(self.upload_url())
                    .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
                    )
                    .body(multipart_body(&metadata, mime_type, &content))
            }
        };

        let file: RemoteFile = self.send_json(request).await?;
        if file.id.is_empty() {
            return Err(DriveError::Parse("upload response without id".to_string()));
        }
        info!(id = %file.id, name, replaced = existing_id.is_some(), "Uploaded file");
        Ok(file)
    }

    /// Downloads a file's content.
    #[instrument(skip(self))]
    pub async fn download_raw(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let request = self
            .http
            .get(format!("{}/{file_id}", self.files_url()))
            .query(&[("alt", "media")]);
        let bytes = self
            .send(request)
            .await?
            .bytes()
            .await
            .map_err(DriveError::from_request)?;
        Ok(bytes.to_vec())
    }
}

impl RemoteStorage for DriveClient {
    async fn find_folder(&self, parent_id: &str, name: &str) -> Result<Option<RemoteFolder>, CoreError> {
        Ok(self.find_named(parent_id, name, true).await?.map(RemoteFolder::from))
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<RemoteFolder, CoreError> {
        Ok(self.create_folder_raw(parent_id, name).await?.into())
    }

    async fn find_file(&self, parent_id: &str, name: &str) -> Result<Option<RemoteFile>, CoreError> {
        Ok(self.find_named(parent_id, name, false).await?)
    }

    async fn upload_file(
        &self,
        parent_id: &str,
        name: &str,
        mime_type: &str,
        content: Vec<u8>,
        existing_id: Option<&str>,
    ) -> Result<RemoteFile, CoreError> {
        self.upload_raw(parent_id, name, mime_type, content, existing_id)
            .await
            .map_err(|e| match e {
                DriveError::AuthenticationFailed(msg) => CoreError::Authentication(msg),
                other => CoreError::Upload {
                    file: name.to_string(),
                    message: other.to_string(),
                },
            })
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, CoreError> {
        Ok(self.download_raw(file_id).await?)
    }

    async fn list_children(&self, parent_id: &str) -> Result<Vec<RemoteFile>, CoreError> {
        let q = format!("'{}' in parents and trashed = false", escape_query(parent_id));
        Ok(self.list(&q).await?)
    }
}

/// `error.errors[].reason` values sent with a 403 that are not about
/// credentials.
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded", "dailyLimitExceeded"];
const QUOTA_REASONS: &[&str] = &["storageQuotaExceeded", "quotaExceeded", "teamDriveFileLimitExceeded"];

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    reason: String,
}

/// Maps a non-success response to an error.
///
/// 401 is always an authentication failure. 403 is one unless the body
/// names a rate limit or quota reason.
fn classify_failure(status: StatusCode, body: String) -> DriveError {
    if status == StatusCode::UNAUTHORIZED {
        return DriveError::AuthenticationFailed(format!("storage API returned {status}: {body}"));
    }
    if status == StatusCode::FORBIDDEN {
        let reasons: Vec<String> = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error.errors.into_iter().map(|e| e.reason).collect())
            .unwrap_or_default();
        if let Some(reason) = reasons.iter().find(|r| RATE_LIMIT_REASONS.contains(&r.as_str())) {
            return DriveError::RateLimited(reason.clone());
        }
        if !reasons.iter().any(|r| QUOTA_REASONS.contains(&r.as_str())) {
            return DriveError::AuthenticationFailed(format!("storage API returned {status}: {body}"));
        }
    }
    DriveError::Api {
        status: status.as_u16(),
        message: body,
    }
}

/// Escapes a value for use inside a single-quoted `q` literal.
pub fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn multipart_body(metadata: &serde_json::Value, mime_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n--{MULTIPART_BOUNDARY}\r\nContent-Type: {mime_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}
