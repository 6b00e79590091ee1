//! JSON output formatting.

use anyhow::Result;
use serde::Serialize;

use crate::status::TreeNode;

/// JSON formatter.
#[derive(Debug)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }

    /// Formats the remote folder tree.
    pub fn format_tree(&self, root_id: &str, nodes: &[TreeNode]) -> Result<String> {
        #[derive(Serialize)]
        struct TreeOutput<'a> {
            root: &'a str,
            children: &'a [TreeNode],
        }

        self.format(&TreeOutput {
            root: root_id,
            children: nodes,
        })
    }
}
