//! JSON files on disk.
//!
//! Everything written here may hold secrets, so files are created 0600
//! and new directories 0700.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default cache directory.
///
/// - macOS: `~/Library/Caches/tally`
/// - Linux: `~/.cache/tally`
/// - Windows: `%LOCALAPPDATA%\tally`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tally")
}

/// Returns the default storage token cache path.
pub fn default_token_cache_path() -> PathBuf {
    default_cache_dir().join("drive_token.json")
}

// ============================================================================
// Permissions
// ============================================================================

const OWNER_FILE_MODE: u32 = 0o600;
const OWNER_DIR_MODE: u32 = 0o700;

/// Restricts `path` to `mode`. Only meaningful on Unix.
#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    debug!(path = %path.display(), mode = %format!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Saves data to a JSON file readable only by the owner.
///
/// A missing parent directory is created with 0o700 permissions. The
/// write goes through a temp file and a rename.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &json).await?;
    restrict(&temp_path, OWNER_FILE_MODE).await?;
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), bytes = json.len(), "Saved");
    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Ensures a directory exists; newly created directories get 0o700.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !tokio::fs::try_exists(path).await? {
        tokio::fs::create_dir_all(path).await?;
        restrict(path, OWNER_DIR_MODE).await?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
