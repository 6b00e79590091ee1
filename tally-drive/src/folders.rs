//! Folder path resolution.

use tally_core::{CoreError, RemoteFolder, RemoteStorage};
use tracing::{debug, info, instrument};

/// Returns the folder `name` under `parent_id`, creating it if absent.
pub async fn resolve_or_create<S: RemoteStorage>(
    storage: &S,
    parent_id: &str,
    name: &str,
) -> Result<RemoteFolder, CoreError> {
    if let Some(folder) = storage.find_folder(parent_id, name).await? {
        debug!(id = %folder.id, name, "Found folder");
        return Ok(folder);
    }
    let folder = storage.create_folder(parent_id, name).await?;
    info!(id = %folder.id, name, parent_id, "Created missing folder");
    Ok(folder)
}

/// Resolves a folder path below `root_id`, creating missing segments.
///
/// An empty path resolves to the root itself.
#[instrument(skip(storage))]
pub async fn resolve_path<S: RemoteStorage>(
    storage: &S,
    root_id: &str,
    path: &[String],
) -> Result<RemoteFolder, CoreError> {
    let mut current = RemoteFolder {
        id: root_id.to_string(),
        name: String::new(),
    };
    for segment in path {
        current = resolve_or_create(storage, &current.id, segment).await?;
    }
    Ok(current)
}

/// Resolves a folder path without creating anything.
///
/// Returns `None` as soon as a segment is missing.
pub async fn find_path<S: RemoteStorage>(
    storage: &S,
    root_id: &str,
    path: &[String],
) -> Result<Option<RemoteFolder>, CoreError> {
    let mut current = RemoteFolder {
        id: root_id.to_string(),
        name: String::new(),
    };
    for segment in path {
        match storage.find_folder(&current.id, segment).await? {
            Some(folder) => current = folder,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}
