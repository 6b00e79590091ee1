//! Cached tool and user lookup tables.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tally_core::{ReferenceTables, UserInfo};
use tracing::{info, warn};

use crate::error::StoreError;

/// File name of the cached tool table.
pub const TOOL_LIST_FILE: &str = "tool_list.csv";
/// File name of the cached user table.
pub const USER_LIST_FILE: &str = "user_list.csv";

#[derive(Debug, Serialize, Deserialize)]
struct ToolRow {
    id: String,
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRow {
    id: String,
    username: String,
    full_name: String,
    email: String,
}

/// Writes both tables into `dir`, replacing previous copies.
pub fn save_reference(dir: &Path, tables: &ReferenceTables) -> Result<(), StoreError> {
    std::fs::create_dir_all(dir)?;

    let mut tools = csv::Writer::from_path(dir.join(TOOL_LIST_FILE))?;
    for (id, name) in &tables.tools {
        tools.serialize(ToolRow {
            id: id.clone(),
            name: name.clone(),
        })?;
    }
    tools.flush()?;

    let mut users = csv::Writer::from_path(dir.join(USER_LIST_FILE))?;
    for (id, user) in &tables.users {
        users.serialize(UserRow {
            id: id.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
        })?;
    }
    users.flush()?;

    info!(
        tools = tables.tools.len(),
        users = tables.users.len(),
        dir = %dir.display(),
        "Saved reference tables"
    );
    Ok(())
}

/// Loads both tables from `dir`.
///
/// A missing file yields an empty table and a warning.
pub fn load_reference(dir: &Path) -> Result<ReferenceTables, StoreError> {
    let tools = load_rows::<ToolRow>(&dir.join(TOOL_LIST_FILE))?
        .into_iter()
        .map(|row| (row.id, row.name))
        .collect();
    let users = load_rows::<UserRow>(&dir.join(USER_LIST_FILE))?
        .into_iter()
        .map(|row| {
            (
                row.id,
                UserInfo {
                    username: row.username,
                    full_name: row.full_name,
                    email: row.email,
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    Ok(ReferenceTables { tools, users })
}

fn load_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        warn!(path = %path.display(), "Reference table not found, using empty table");
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}
