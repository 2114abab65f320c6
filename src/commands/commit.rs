use std::io::Read;

use anyhow::{Context, Result};
use calsync_core::ChangeSet;
use calsync_core::config::SyncConfig;

pub async fn run(config: &SyncConfig) -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read change set from stdin")?;

    let changes = parse_change_set(&input)?;
    if changes.is_empty() {
        println!("No changes to commit.");
        return Ok(());
    }

    let sync = super::load(config).await?;
    let report = sync.commit(changes).await;
    super::finish(&report)
}

fn parse_change_set(input: &str) -> Result<ChangeSet> {
    serde_json::from_str(input).context("Invalid change set JSON")
}
