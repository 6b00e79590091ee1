//! End-to-end publish against a mocked token endpoint and storage API.

use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;
use tally_core::{CSV_MIME_TYPE, ExportFile, FOLDER_MIME_TYPE, YearMonth};
use tally_drive::{Credentials, DriveClient, TokenProvider, publish};
use tally_store::TokenCache;

const TEST_KEY: &str = include_str!("fixtures/test_key.pem");

fn service_account(token_uri: &str) -> Credentials {
    let raw = json!({
        "type": "service_account",
        "client_email": "exporter@lab.iam.example.com",
        "private_key": TEST_KEY,
        "private_key_id": "k1",
        "token_uri": token_uri,
    });
    Credentials::from_json(&raw.to_string()).unwrap()
}

#[tokio::test]
async fn test_publish_with_service_account() {
    let server = MockServer::start_async().await;

    let token = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/token")
                .body_includes("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer");
            then.status(200)
                .json_body(json!({"access_token": "ya29.sa", "expires_in": 3600}));
        })
        .await;
    let lookups = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/drive/v3/files")
                .header("authorization", "Bearer ya29.sa");
            then.status(200).json_body(json!({"files": []}));
        })
        .await;
    let year = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/drive/v3/files")
                .json_body(json!({"name": "2025", "mimeType": FOLDER_MIME_TYPE, "parents": ["root"]}));
            then.status(200)
                .json_body(json!({"id": "y2025", "name": "2025", "mimeType": FOLDER_MIME_TYPE}));
        })
        .await;
    let leaf = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/drive/v3/files")
                .json_body(json!({"name": "Billing_Data", "mimeType": FOLDER_MIME_TYPE, "parents": ["y2025"]}));
            then.status(200)
                .json_body(json!({"id": "bill", "name": "Billing_Data", "mimeType": FOLDER_MIME_TYPE}));
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/upload/drive/v3/files")
                .body_includes("\"parents\":[\"bill\"]");
            then.status(200).json_body(json!({
                "id": "file-9",
                "name": "billing_data_2025_10.csv",
                "mimeType": CSV_MIME_TYPE
            }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("token.json");
    let http = reqwest::Client::new();
    let auth = TokenProvider::new(
        http.clone(),
        service_account(&server.url("/token")),
        TokenCache::new(cache_path.clone()),
    );
    let client = DriveClient::new(http, &server.base_url(), auth);

    let local = dir.path().join("billing_data_2025_10.csv");
    std::fs::write(&local, "item_id,start\n1,2025-10-02T10:00:00Z\n").unwrap();
    let files = vec![ExportFile {
        path: local.clone(),
        group: None,
        period: YearMonth::new(2025, 10).unwrap(),
        record_count: 1,
    }];

    let report = publish(
        &client,
        "root",
        &["2025".to_string(), "Billing_Data".to_string()],
        files,
        CSV_MIME_TYPE,
    )
    .await
    .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.folder.id, "bill");
    assert_eq!(report.uploaded[0].id, "file-9");
    assert!(!local.exists());
    assert!(cache_path.exists());

    token.assert_calls_async(1).await;
    // Two folder lookups and one file lookup.
    lookups.assert_calls_async(3).await;
    year.assert_async().await;
    leaf.assert_async().await;
    upload.assert_async().await;
}

#[tokio::test]
async fn test_failed_upload_keeps_local_file() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .json_body(json!({"access_token": "ya29.sa", "expires_in": 3600}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/drive/v3/files").query_param(
                "q",
                "name = '2025' and 'root' in parents and mimeType = 'application/vnd.google-apps.folder' and trashed = false",
            );
            then.status(200).json_body(json!({
                "files": [{"id": "y2025", "name": "2025", "mimeType": FOLDER_MIME_TYPE}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/drive/v3/files").query_param(
                "q",
                "name = 'billing_data_2025_10.csv' and 'y2025' in parents and mimeType != 'application/vnd.google-apps.folder' and trashed = false",
            );
            then.status(200).json_body(json!({"files": []}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/upload/drive/v3/files");
            then.status(403).body("insufficient permissions");
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let http = reqwest::Client::new();
    let auth = TokenProvider::new(
        http.clone(),
        service_account(&server.url("/token")),
        TokenCache::new(dir.path().join("token.json")),
    );
    let client = DriveClient::new(http, &server.base_url(), auth);

    let local = dir.path().join("billing_data_2025_10.csv");
    std::fs::write(&local, "item_id\n1\n").unwrap();
    let report = publish(
        &client,
        "root",
        &["2025".to_string()],
        vec![ExportFile {
            path: local.clone(),
            group: None,
            period: YearMonth::new(2025, 10).unwrap(),
            record_count: 1,
        }],
        CSV_MIME_TYPE,
    )
    .await
    .unwrap();

    assert!(local.exists());
    assert!(report.uploaded.is_empty());
    assert!(report.into_result().unwrap_err().is_authentication());
    assert!(!dir.path().join("token.json").exists());
}
