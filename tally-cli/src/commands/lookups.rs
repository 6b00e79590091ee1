//! Lookups command - refresh the tool and user tables.

use anyhow::Result;
use tally_store::JobConfig;

use crate::context;
use crate::job::refresh_lookups;

/// Runs the lookups command.
pub async fn run(config: &JobConfig) -> Result<()> {
    let source = context::record_source(config)?;
    let tables = refresh_lookups(&source, &config.work_dir).await?;
    println!(
        "Tools: {} ({})\nUsers: {} ({})",
        tables.tools.len(),
        config.tool_list_path().display(),
        tables.users.len(),
        config.user_list_path().display()
    );
    Ok(())
}
