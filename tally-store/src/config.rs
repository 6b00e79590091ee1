//! Job configuration from the environment.
//!
//! Every setting is read from a `TALLY_*` variable. A `.env` file is
//! loaded first when present; variables already set in the process
//! environment take precedence over it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::default_token_cache_path;

/// API token for the record API.
pub const ENV_API_TOKEN: &str = "TALLY_API_TOKEN";
/// Storage folder id all exports go under.
pub const ENV_DRIVE_PARENT_ID: &str = "TALLY_DRIVE_PARENT_ID";
/// Base URL of the record API.
pub const ENV_API_BASE_URL: &str = "TALLY_API_BASE_URL";
/// Authorization scheme placed before the token.
pub const ENV_API_AUTH_SCHEME: &str = "TALLY_API_AUTH_SCHEME";
/// Cap on records kept per fetch.
pub const ENV_MAX_RECORDS: &str = "TALLY_MAX_RECORDS";
/// Storage credentials file.
pub const ENV_CREDENTIALS_FILE: &str = "TALLY_CREDENTIALS_FILE";
/// Storage access token cache.
pub const ENV_TOKEN_CACHE: &str = "TALLY_TOKEN_CACHE";
/// Base URL of the storage API.
pub const ENV_DRIVE_API_BASE: &str = "TALLY_DRIVE_API_BASE";
/// Directory for transient export files and reference tables.
pub const ENV_WORK_DIR: &str = "TALLY_WORK_DIR";
/// HTTP timeout in seconds.
pub const ENV_HTTP_TIMEOUT_SECS: &str = "TALLY_HTTP_TIMEOUT_SECS";

const DEFAULT_API_BASE_URL: &str = "https://nemo.stanford.edu/";
const DEFAULT_AUTH_SCHEME: &str = "Token";
const DEFAULT_MAX_RECORDS: usize = 2000;
const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings for one job run.
#[derive(Clone)]
pub struct JobConfig {
    /// Record API token.
    pub api_token: String,
    /// Storage folder id exports are placed under.
    pub drive_parent_id: String,
    /// Record API base URL.
    pub api_base_url: String,
    /// Authorization scheme, e.g. `Token` or `Bearer`.
    pub api_auth_scheme: String,
    /// Cap on records kept per fetch.
    pub max_records: usize,
    /// Storage credentials file.
    pub credentials_file: PathBuf,
    /// Storage access token cache file.
    pub token_cache: PathBuf,
    /// Storage API base URL.
    pub drive_api_base: String,
    /// Working directory for local files.
    pub work_dir: PathBuf,
    /// HTTP timeout for both APIs.
    pub http_timeout: Duration,
}

impl fmt::Debug for JobConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobConfig")
            .field("api_token", &"<redacted>")
            .field("drive_parent_id", &self.drive_parent_id)
            .field("api_base_url", &self.api_base_url)
            .field("api_auth_scheme", &self.api_auth_scheme)
            .field("max_records", &self.max_records)
            .field("credentials_file", &self.credentials_file)
            .field("token_cache", &self.token_cache)
            .field("drive_api_base", &self.drive_api_base)
            .field("work_dir", &self.work_dir)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl JobConfig {
    /// Loads `.env` (or `env_file` when given) and reads the process
    /// environment.
    pub fn from_env(env_file: Option<&Path>) -> Result<Self, StoreError> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    StoreError::Config(format!("cannot load {}: {e}", path.display()))
                })?;
                debug!(path = %path.display(), "Loaded env file");
            }
            None => {
                if let Ok(path) = dotenvy::dotenv() {
                    debug!(path = %path.display(), "Loaded .env");
                }
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StoreError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| StoreError::Config(format!("{key} is not set")))
        };

        let api_token = require(ENV_API_TOKEN)?;
        let drive_parent_id = require(ENV_DRIVE_PARENT_ID)?;

        let max_records = match get(ENV_MAX_RECORDS) {
            Some(v) => parse_positive(ENV_MAX_RECORDS, &v)?,
            None => DEFAULT_MAX_RECORDS,
        };
        let timeout_secs = match get(ENV_HTTP_TIMEOUT_SECS) {
            Some(v) => parse_positive(ENV_HTTP_TIMEOUT_SECS, &v)? as u64,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let config = Self {
            api_token,
            drive_parent_id,
            api_base_url: get(ENV_API_BASE_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            api_auth_scheme: get(ENV_API_AUTH_SCHEME)
                .unwrap_or_else(|| DEFAULT_AUTH_SCHEME.to_string()),
            max_records,
            credentials_file: get(ENV_CREDENTIALS_FILE)
                .map_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE), PathBuf::from),
            token_cache: get(ENV_TOKEN_CACHE).map_or_else(default_token_cache_path, PathBuf::from),
            drive_api_base: get(ENV_DRIVE_API_BASE)
                .unwrap_or_else(|| DEFAULT_DRIVE_API_BASE.to_string()),
            work_dir: get(ENV_WORK_DIR).map_or_else(|| PathBuf::from("."), PathBuf::from),
            http_timeout: Duration::from_secs(timeout_secs),
        };

        info!(
            api = %config.api_base_url,
            parent = %config.drive_parent_id,
            work_dir = %config.work_dir.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Path of the cached tool table.
    pub fn tool_list_path(&self) -> PathBuf {
        self.work_dir.join(crate::reference::TOOL_LIST_FILE)
    }

    /// Path of the cached user table.
    pub fn user_list_path(&self) -> PathBuf {
        self.work_dir.join(crate::reference::USER_LIST_FILE)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize, StoreError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(StoreError::Config(format!(
            "{key} must be a positive integer, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = JobConfig::from_lookup(lookup(&[
            (ENV_API_TOKEN, "abc"),
            (ENV_DRIVE_PARENT_ID, "root-folder"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api_auth_scheme, "Token");
        assert_eq!(config.max_records, 2000);
        assert_eq!(config.credentials_file, PathBuf::from("credentials.json"));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.tool_list_path(), PathBuf::from("./tool_list.csv"));
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let err = JobConfig::from_lookup(lookup(&[(ENV_DRIVE_PARENT_ID, "root")])).unwrap_err();
        assert!(err.to_string().contains(ENV_API_TOKEN));
    }

    #[test]
    fn test_blank_parent_is_missing() {
        let err = JobConfig::from_lookup(lookup(&[
            (ENV_API_TOKEN, "abc"),
            (ENV_DRIVE_PARENT_ID, "  "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_DRIVE_PARENT_ID));
    }

    #[test]
    fn test_overrides() {
        let config = JobConfig::from_lookup(lookup(&[
            (ENV_API_TOKEN, "abc"),
            (ENV_DRIVE_PARENT_ID, "root"),
            (ENV_API_AUTH_SCHEME, "Bearer"),
            (ENV_MAX_RECORDS, "500"),
            (ENV_WORK_DIR, "/var/tmp/tally"),
            (ENV_HTTP_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_auth_scheme, "Bearer");
        assert_eq!(config.max_records, 500);
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/tally"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_number() {
        let err = JobConfig::from_lookup(lookup(&[
            (ENV_API_TOKEN, "abc"),
            (ENV_DRIVE_PARENT_ID, "root"),
            (ENV_MAX_RECORDS, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = JobConfig::from_lookup(lookup(&[
            (ENV_API_TOKEN, "super-secret"),
            (ENV_DRIVE_PARENT_ID, "root"),
        ]))
        .unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn test_env_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.env");
        std::fs::write(&path, "TALLY_TEST_ONLY_MARKER=from-file\n").unwrap();
        // from_env fails on the required variables, but the file is read first.
        let _ = JobConfig::from_env(Some(&path));
        assert_eq!(std::env::var("TALLY_TEST_ONLY_MARKER").as_deref(), Ok("from-file"));
    }

    #[test]
    fn test_missing_env_file_is_config_error() {
        let err = JobConfig::from_env(Some(Path::new("/nonexistent/tally.env"))).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
