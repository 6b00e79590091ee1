//! Remote folder tree listing.

use serde::Serialize;
use tally_core::{CoreError, RemoteStorage};

/// Folder levels listed below the root: years, their subfolders, files.
pub const TREE_DEPTH: usize = 3;

/// One object in the remote tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    /// Object name.
    pub name: String,
    /// Storage object id.
    pub id: String,
    /// Whether the object is a folder.
    pub folder: bool,
    /// Last modification time, for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    /// Children, for folders.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Lists the tree below `parent_id`, at most `depth` levels deep.
///
/// Folders come first, then files, each sorted by name.
pub async fn list_tree<S: RemoteStorage>(
    storage: &S,
    parent_id: &str,
    depth: usize,
) -> Result<Vec<TreeNode>, CoreError> {
    if depth == 0 {
        return Ok(Vec::new());
    }
    let mut children = storage.list_children(parent_id).await?;
    children.sort_by(|a, b| b.is_folder().cmp(&a.is_folder()).then_with(|| a.name.cmp(&b.name)));

    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        let folder = child.is_folder();
        let grandchildren = if folder {
            Box::pin(list_tree(storage, &child.id, depth - 1)).await?
        } else {
            Vec::new()
        };
        nodes.push(TreeNode {
            name: child.name,
            id: child.id,
            folder,
            modified: child.modified_time,
            children: grandchildren,
        });
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_drive::memory::MemoryStorage;
    use tally_drive::resolve_path;

    #[tokio::test]
    async fn test_tree_orders_folders_first() {
        let storage = MemoryStorage::new("root");
        let usage = resolve_path(&storage, "root", &["2025".into(), "Usage_Data".into()])
            .await
            .unwrap();
        storage.put_file(&usage.id, "b_2025_10.csv", b"x");
        storage.put_file(&usage.id, "a_2025_10.csv", b"x");
        storage.put_file("root", "billing_data_master_master.csv", b"x");
        resolve_path(&storage, "root", &["2024".into()]).await.unwrap();

        let tree = list_tree(&storage, "root", TREE_DEPTH).await.unwrap();
        let top: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(top, vec!["2024", "2025", "billing_data_master_master.csv"]);

        let files: Vec<_> = tree[1].children[0]
            .children
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(files, vec!["a_2025_10.csv", "b_2025_10.csv"]);
    }

    #[tokio::test]
    async fn test_tree_respects_depth() {
        let storage = MemoryStorage::new("root");
        resolve_path(&storage, "root", &["2025".into(), "Billing_Data".into()])
            .await
            .unwrap();
        let tree = list_tree(&storage, "root", 1).await.unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }
}
