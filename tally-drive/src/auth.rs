//! Access tokens for the storage API.

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tally_store::{CachedToken, TokenCache};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::credentials::Credentials;
use crate::error::DriveError;
use crate::jwt::{DRIVE_SCOPE, sign_assertion};

/// Grant type for service account assertions.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Supplies access tokens, reusing the cached one while it is fresh.
#[derive(Debug)]
pub struct TokenProvider {
    http: Client,
    credentials: Credentials,
    cache: TokenCache,
    current: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Creates a provider.
    pub fn new(http: Client, credentials: Credentials, cache: TokenCache) -> Self {
        Self {
            http,
            credentials,
            cache,
            current: Mutex::new(None),
        }
    }

    /// Returns a usable access token.
    ///
    /// Checks the in-memory token, then the cache file, and only then
    /// asks the token endpoint. A cached token issued to another account
    /// counts as a miss. A new token is written back to the cache;
    /// failing to write it is logged and ignored.
    pub async fn access_token(&self) -> Result<String, DriveError> {
        let mut current = self.current.lock().await;
        let now = Utc::now();
        let account = self.credentials.account();

        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.access_token.clone());
        }

        let cached = self
            .cache
            .load()
            .await
            .filter(|t| t.is_fresh(now) && t.is_for(account));
        if let Some(token) = cached {
            debug!(expires_at = %token.expires_at, "Using cached access token");
            let access = token.access_token.clone();
            *current = Some(token);
            return Ok(access);
        }

        let token = self.request_token().await?;
        if let Err(e) = self.cache.save(&token).await {
            warn!(path = %self.cache.path().display(), error = %e, "Failed to cache access token");
        }
        let access = token.access_token.clone();
        *current = Some(token);
        Ok(access)
    }

    /// Forgets the current token, in memory and on disk.
    ///
    /// Called when the storage API rejects the token so the next call
    /// requests a new one.
    pub async fn invalidate(&self) {
        self.current.lock().await.take();
        if let Err(e) = self.cache.clear().await {
            warn!(path = %self.cache.path().display(), error = %e, "Failed to clear token cache");
        }
    }

    #[instrument(skip(self), fields(kind = self.credentials.kind()))]
    async fn request_token(&self) -> Result<CachedToken, DriveError> {
        let now = Utc::now();
        let token_uri = self.credentials.token_uri();

        let request = match &self.credentials {
            Credentials::ServiceAccount(key) => {
                let assertion = sign_assertion(key, DRIVE_SCOPE, now)?;
                self.http.post(token_uri).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ])
            }
            Credentials::AuthorizedUser(user) => self.http.post(token_uri).form(&[
                ("grant_type", "refresh_token"),
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("refresh_token", user.refresh_token.as_str()),
            ]),
        };

        info!("Requesting storage access token");
        let response = request.send().await.map_err(DriveError::from_request)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    DriveError::AuthenticationFailed(format!("token endpoint returned {status}: {body}"))
                }
                _ => DriveError::Api {
                    status: status.as_u16(),
                    message: body,
                },
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveError::Parse(e.to_string()))?;
        let expires_in = body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        debug!(expires_in, "Received access token");
        Ok(CachedToken::new(body.access_token, now, expires_in).for_account(self.credentials.account()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    fn authorized_user(token_uri: &str) -> Credentials {
        Credentials::from_json(
            &json!({
                "type": "authorized_user",
                "client_id": "cid",
                "client_secret": "csecret",
                "refresh_token": "1//refresh",
                "token_uri": token_uri,
            })
            .to_string(),
        )
        .unwrap()
    }

    fn service_account(token_uri: &str) -> Credentials {
        Credentials::from_json(
            &json!({
                "type": "service_account",
                "client_email": "exporter@lab.iam.gserviceaccount.com",
                "private_key": include_str!("../tests/fixtures/test_key.pem"),
                "token_uri": token_uri,
            })
            .to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_grant_and_cache_reuse() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .body_includes("grant_type=refresh_token")
                    .body_includes("refresh_token=1%2F%2Frefresh");
                then.status(200)
                    .json_body(json!({"access_token": "ya29.a", "expires_in": 3599, "token_type": "Bearer"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("token.json");
        let provider = TokenProvider::new(
            Client::new(),
            authorized_user(&server.url("/token")),
            TokenCache::new(&cache_path),
        );
        assert_eq!(provider.access_token().await.unwrap(), "ya29.a");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.a");
        mock.assert_calls_async(1).await;

        // A second process picks the token up from the cache file.
        let second = TokenProvider::new(
            Client::new(),
            authorized_user(&server.url("/token")),
            TokenCache::new(&cache_path),
        );
        assert_eq!(second.access_token().await.unwrap(), "ya29.a");
        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_service_account_assertion_grant() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .body_includes("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer")
                    .body_includes("assertion=");
                then.status(200).json_body(json!({"access_token": "ya29.sa", "expires_in": 3600}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let provider = TokenProvider::new(
            Client::new(),
            service_account(&server.url("/token")),
            TokenCache::new(dir.path().join("token.json")),
        );
        assert_eq!(provider.access_token().await.unwrap(), "ya29.sa");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cached_token_of_other_account_is_ignored() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200).json_body(json!({"access_token": "ya29.new", "expires_in": 3600}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        cache
            .save(&CachedToken::new("ya29.old", Utc::now(), 3600).for_account("someone-else"))
            .await
            .unwrap();

        let provider = TokenProvider::new(Client::new(), authorized_user(&server.url("/token")), cache.clone());
        assert_eq!(provider.access_token().await.unwrap(), "ya29.new");
        mock.assert_calls_async(1).await;
        assert!(cache.load().await.unwrap().is_for("cid"));
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200).json_body(json!({"access_token": "ya29.fresh", "expires_in": 3600}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = TokenCache::new(dir.path().join("token.json"));
        cache
            .save(&CachedToken::new("ya29.revoked", Utc::now(), 3600).for_account("cid"))
            .await
            .unwrap();

        let provider = TokenProvider::new(Client::new(), authorized_user(&server.url("/token")), cache.clone());
        assert_eq!(provider.access_token().await.unwrap(), "ya29.revoked");
        mock.assert_calls_async(0).await;

        provider.invalidate().await;
        assert!(cache.load().await.is_none());
        assert_eq!(provider.access_token().await.unwrap(), "ya29.fresh");
        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_rejected_grant_is_auth_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(400).json_body(json!({"error": "invalid_grant"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let provider = TokenProvider::new(
            Client::new(),
            authorized_user(&server.url("/token")),
            TokenCache::new(dir.path().join("token.json")),
        );
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, DriveError::AuthenticationFailed(_)));
        assert!(!dir.path().join("token.json").exists());
    }
}
