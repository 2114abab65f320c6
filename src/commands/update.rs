use anyhow::Result;
use calsync_core::config::SyncConfig;
use calsync_core::{ChangeSet, EventPatch};

use crate::when::parse_when;

pub async fn run(
    config: &SyncConfig,
    id: &str,
    title: Option<String>,
    start: Option<String>,
    end: Option<String>,
    rrule: Option<String>,
    exdate: Option<String>,
) -> Result<()> {
    let patch = EventPatch {
        start: start.as_deref().map(parse_when).transpose()?,
        end: end.as_deref().map(parse_when).transpose()?,
        title,
        rrule,
        exdate,
    };

    if patch.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one of --title, --start, --end, --rrule, --exdate");
    }

    let sync = super::load(config).await?;
    let report = sync.commit(ChangeSet::change(id, patch)).await;

    if report.skipped.iter().any(|skipped| skipped == id) {
        anyhow::bail!("Event '{}' not found", id);
    }
    super::finish(&report)
}
