//! Cached storage access token.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::persistence::{load_json, save_json};

/// How long before expiry a cached token stops being reused.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// An access token, the account it was issued to and the instant it expires.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    /// Bearer token for the storage API.
    pub access_token: String,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
    /// Service account email or OAuth client id the token belongs to.
    #[serde(default)]
    pub account: Option<String>,
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("account", &self.account)
            .finish()
    }
}

impl CachedToken {
    /// Creates a token expiring `expires_in_secs` after `now`.
    pub fn new(access_token: impl Into<String>, now: DateTime<Utc>, expires_in_secs: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: now + Duration::seconds(expires_in_secs),
            account: None,
        }
    }

    /// Tags the token with the account it was issued to.
    #[must_use]
    pub fn for_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Returns true if the token was issued to `account`.
    ///
    /// Untagged tokens match nothing.
    pub fn is_for(&self, account: &str) -> bool {
        self.account.as_deref() == Some(account)
    }

    /// Returns true if the token can still be used at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Single-owner token cache file.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    /// Creates a cache backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached token.
    ///
    /// A missing or unreadable cache is treated as empty.
    pub async fn load(&self) -> Option<CachedToken> {
        match load_json(&self.path).await {
            Ok(token) => Some(token),
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cached token");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable token cache");
                None
            }
        }
    }

    /// Stores a token, readable only by the owner.
    pub async fn save(&self, token: &CachedToken) -> Result<(), StoreError> {
        save_json(&self.path, token).await
    }

    /// Removes the cache file. A missing file is not an error.
    pub async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Cleared token cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
