//! Storage API credentials.
//!
//! The credentials file is the JSON document issued by the storage
//! provider. Two kinds are understood:
//!
//! - **`service_account`**: a private key used to sign a JWT assertion
//! - **`authorized_user`**: an OAuth client plus a refresh token

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::DriveError;

/// Default OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Loaded credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// Service account key.
    ServiceAccount(ServiceAccountKey),
    /// User OAuth refresh token.
    AuthorizedUser(AuthorizedUser),
}

/// Service account key file contents.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Account email, the JWT issuer.
    pub client_email: String,
    /// PKCS#8 PEM private key.
    pub private_key: String,
    /// Key id placed in the JWT header.
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Token endpoint, also the JWT audience.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// Authorized user file contents.
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Refresh token for offline access.
    pub refresh_token: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl Credentials {
    /// Loads credentials from a file.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, DriveError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DriveError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        let creds = Self::from_json(&content)?;
        debug!(kind = creds.kind(), "Loaded credentials");
        Ok(creds)
    }

    /// Parses credentials from JSON text.
    pub fn from_json(content: &str) -> Result<Self, DriveError> {
        serde_json::from_str(content).map_err(|e| DriveError::Credentials(e.to_string()))
    }

    /// Credential kind as written in the file.
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::ServiceAccount(_) => "service_account",
            Credentials::AuthorizedUser(_) => "authorized_user",
        }
    }

    /// Identity a token is issued to: the service account email or the
    /// OAuth client id.
    pub fn account(&self) -> &str {
        match self {
            Credentials::ServiceAccount(key) => &key.client_email,
            Credentials::AuthorizedUser(user) => &user.client_id,
        }
    }

    /// Token endpoint for these credentials.
    pub fn token_uri(&self) -> &str {
        match self {
            Credentials::ServiceAccount(key) => &key.token_uri,
            Credentials::AuthorizedUser(user) => &user.token_uri,
        }
    }
}
