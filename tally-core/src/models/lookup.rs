//! Reference lookup tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder for a tool id missing from the tool table.
pub const UNKNOWN_TOOL: &str = "Unknown Tool";
/// Placeholder for a user id missing from the user table.
pub const UNKNOWN_USER: &str = "Unknown User";
/// Placeholder for a user without a known email.
pub const UNKNOWN_EMAIL: &str = "Unknown Email";

/// One row of the user table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Login name.
    pub username: String,
    /// First and last name joined by a space.
    pub full_name: String,
    /// Contact address.
    pub email: String,
}

/// Tool and user tables keyed by their API ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTables {
    /// Tool id to tool name.
    pub tools: BTreeMap<String, String>,
    /// User id to user details.
    pub users: BTreeMap<String, UserInfo>,
}

impl ReferenceTables {
    /// Returns true if both tables are empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.users.is_empty()
    }

    /// Tool name for `id`.
    pub fn tool_name(&self, id: &str) -> Option<&str> {
        self.tools.get(id).map(String::as_str)
    }

    /// User details for `id`.
    pub fn user(&self, id: &str) -> Option<&UserInfo> {
        self.users.get(id)
    }
}
