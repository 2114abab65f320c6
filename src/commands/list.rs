use anyhow::{Context, Result};
use calsync_core::config::SyncConfig;
use owo_colors::OwoColorize;

use crate::render::{Render, render_failure};
use crate::store;

pub async fn run(config: &SyncConfig, json: bool) -> Result<()> {
    let tz = config.timezone()?;
    let sync = store::synchronizer(config)?;
    let report = sync.load_all().await;

    for failure in &report.failures {
        eprintln!("{}", render_failure(failure));
    }

    if json {
        let output = serde_json::to_string_pretty(&sync.snapshot())
            .context("Failed to serialize events")?;
        println!("{}", output);
        return Ok(());
    }

    let occurrences = sync.snapshot();
    println!(
        "{}",
        format!("📅 {} events ({}, {})", occurrences.len(), sync.locale(), tz).bold()
    );
    if occurrences.is_empty() {
        println!("   {}", "(no events)".dimmed());
    }
    for occurrence in &occurrences {
        println!("   {}", occurrence.render(tz));
    }

    Ok(())
}
