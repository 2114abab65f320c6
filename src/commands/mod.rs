pub mod add;
pub mod commit;
pub mod delete;
pub mod list;
pub mod update;

use anyhow::Result;
use calsync_core::config::SyncConfig;
use calsync_core::{CommitReport, Synchronizer};

use crate::render::{render_commit, render_failure};
use crate::store::{self, SharedStore};

/// Build a synchronizer and fill its cache, as every edit needs the
/// current series to merge against.
pub async fn load(config: &SyncConfig) -> Result<Synchronizer<SharedStore>> {
    let sync = store::synchronizer(config)?;
    let report = sync.load_all().await;

    for failure in &report.failures {
        eprintln!("{}", render_failure(failure));
    }
    Ok(sync)
}

/// Print a commit report and turn any failure into an error exit.
pub fn finish(report: &CommitReport) -> Result<()> {
    for line in render_commit(report) {
        println!("{}", line);
    }

    if !report.is_success() {
        anyhow::bail!("{} change(s) failed", report.failures.len());
    }
    Ok(())
}
