use anyhow::Result;
use calsync_core::config::SyncConfig;
use calsync_core::{ChangeSet, OccurrenceKey};

use crate::when::parse_when;

pub async fn run(config: &SyncConfig, id: &str, occurrence: Option<&str>) -> Result<()> {
    let sync = super::load(config).await?;

    let report = match occurrence {
        Some(start) => {
            let key = OccurrenceKey {
                template_id: id.to_string(),
                start: parse_when(start)?,
            };
            let report = sync.delete_occurrence(&key).await;
            if !report.skipped.is_empty() {
                anyhow::bail!("No occurrence of '{}' starts at {}", id, key.start);
            }
            report
        }
        None => {
            if sync.cache().series(id).is_none() {
                anyhow::bail!("Event '{}' not found", id);
            }
            sync.commit(ChangeSet::delete(id)).await
        }
    };

    super::finish(&report)
}
