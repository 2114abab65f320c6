use anyhow::Result;
use calsync_core::config::SyncConfig;
use calsync_core::{ChangeSet, EventPatch};

use crate::store;
use crate::when::{parse_when, resolve_end};

pub async fn run(
    config: &SyncConfig,
    title: String,
    start: String,
    end: Option<String>,
    duration: Option<String>,
    rrule: Option<String>,
    exdate: Option<String>,
) -> Result<()> {
    let start = parse_when(&start)?;
    let end = resolve_end(start, end.as_deref(), duration.as_deref())?;

    let patch = EventPatch {
        start: Some(start),
        end: Some(end),
        title: Some(title),
        rrule,
        exdate,
    };

    // Adding needs no cached state, so skip the initial load.
    let sync = store::synchronizer(config)?;
    let report = sync.commit(ChangeSet::add(patch)).await;

    super::finish(&report)
}
