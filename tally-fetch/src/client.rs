//! HTTP client for the record API.

use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::error::FetchError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent string for Tally.
const USER_AGENT: &str = concat!("tally/", env!("CARGO_PKG_VERSION"));

/// HTTP client that sends authenticated JSON GET requests.
///
/// There is no retry: a failed request fails the run, and the next
/// scheduled run starts over.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    timeout_secs: u64,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new HTTP client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner: client,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Performs a GET request with an authorization header and decodes
    /// the JSON body.
    ///
    /// 401 and 403 map to [`FetchError::AuthenticationFailed`].
    #[instrument(skip(self, auth_header, query), fields(url = %url))]
    pub async fn get_json(
        &self,
        url: &Url,
        auth_header: &str,
        query: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        debug!("GET request with auth");

        let mut request = self
            .inner
            .get(url.clone())
            .header(header::AUTHORIZATION, auth_header)
            .header(header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        debug!(status = %status, "Response received");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::AuthenticationFailed(format!(
                "API rejected token ({status})"
            )));
        }
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout_secs)
        } else {
            FetchError::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_json_sends_auth_and_query() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/things/")
                    .header("authorization", "Token secret")
                    .query_param("start", "10/01/2025");
                then.status(200).json_body(json!([{"id": 1}]));
            })
            .await;

        let client = HttpClient::new().unwrap();
        let url = Url::parse(&server.url("/api/things/")).unwrap();
        let body = client
            .get_json(&url, "Token secret", &[("start", "10/01/2025".to_string())])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn test_forbidden_is_auth_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/things/");
                then.status(403).body("{\"detail\":\"nope\"}");
            })
            .await;

        let client = HttpClient::new().unwrap();
        let url = Url::parse(&server.url("/api/things/")).unwrap();
        let err = client.get_json(&url, "Token bad", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_unexpected_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/things/");
                then.status(500);
            })
            .await;

        let client = HttpClient::new().unwrap();
        let url = Url::parse(&server.url("/api/things/")).unwrap();
        let err = client.get_json(&url, "Token t", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_http_error() {
        let client = HttpClient::with_timeout(Duration::from_secs(2)).unwrap();
        let url = Url::parse("http://127.0.0.1:9/api/things/").unwrap();
        let err = client.get_json(&url, "Token t", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_) | FetchError::Timeout(_)));
    }
}
