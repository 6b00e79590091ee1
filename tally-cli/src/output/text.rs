//! Plain text output.

use std::time::Duration;

use crate::job::RunSummary;
use crate::master::MasterReport;
use crate::status::TreeNode;

/// Text formatter.
#[derive(Debug, Default)]
pub struct TextFormatter;

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new() -> Self {
        Self
    }

    /// Formats the end-of-run summary.
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        let mut lines = vec![
            format!("Months processed: {}", summary.months),
            format!("Total files uploaded: {}", summary.files_uploaded),
        ];
        if summary.dropped > 0 {
            lines.push(format!("Records dropped: {}", summary.dropped));
        }
        if summary.truncated > 0 {
            lines.push(format!("Records truncated: {}", summary.truncated));
        }
        lines.push(format!("Elapsed: {}", format_elapsed(summary.elapsed)));
        lines.join("\n")
    }

    /// Formats master update results.
    pub fn format_masters(&self, reports: &[MasterReport]) -> String {
        reports
            .iter()
            .map(|r| {
                if r.uploaded {
                    format!("{}: {} rows ({} replaced)", r.name, r.rows, r.replaced)
                } else {
                    format!("{}: nothing to upload", r.name)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats the remote folder tree, one object per line.
    pub fn format_tree(&self, nodes: &[TreeNode]) -> String {
        let mut lines = Vec::new();
        push_nodes(&mut lines, nodes, 0);
        if lines.is_empty() {
            lines.push("(empty)".to_string());
        }
        lines.join("\n")
    }
}

fn push_nodes(lines: &mut Vec<String>, nodes: &[TreeNode], level: usize) {
    let indent = "  ".repeat(level);
    for node in nodes {
        if node.folder {
            lines.push(format!("{indent}{}/", node.name));
            push_nodes(lines, &node.children, level + 1);
        } else {
            match &node.modified {
                Some(modified) => lines.push(format!("{indent}{}  {modified}", node.name)),
                None => lines.push(format!("{indent}{}", node.name)),
            }
        }
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, modified: Option<&str>) -> TreeNode {
        TreeNode {
            name: name.to_string(),
            id: name.to_string(),
            folder: false,
            modified: modified.map(str::to_string),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_summary_has_upload_total() {
        let summary = RunSummary {
            months: 1,
            files_uploaded: 15,
            dropped: 0,
            truncated: 1945,
            elapsed: Duration::from_millis(2500),
        };
        let text = TextFormatter::new().format_summary(&summary);
        assert!(text.contains("Total files uploaded: 15"));
        assert!(text.contains("Records truncated: 1945"));
        assert!(!text.contains("dropped"));
        assert!(text.ends_with("Elapsed: 2.5s"));
    }

    #[test]
    fn test_elapsed_minutes() {
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_tree_indents_children() {
        let tree = vec![TreeNode {
            name: "2025".into(),
            id: "f1".into(),
            folder: true,
            modified: None,
            children: vec![file("billing_data_2025_10.csv", Some("2025-10-14T06:00:00Z"))],
        }];
        assert_eq!(
            TextFormatter::new().format_tree(&tree),
            "2025/\n  billing_data_2025_10.csv  2025-10-14T06:00:00Z"
        );
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(TextFormatter::new().format_tree(&[]), "(empty)");
    }

    #[test]
    fn test_masters() {
        let reports = vec![
            MasterReport {
                name: "billing_data_2025_master.csv".into(),
                rows: 10,
                replaced: 3,
                uploaded: true,
            },
            MasterReport {
                name: "billing_data_master_master.csv".into(),
                rows: 0,
                replaced: 0,
                uploaded: false,
            },
        ];
        let text = TextFormatter::new().format_masters(&reports);
        assert_eq!(
            text,
            "billing_data_2025_master.csv: 10 rows (3 replaced)\nbilling_data_master_master.csv: nothing to upload"
        );
    }
}
