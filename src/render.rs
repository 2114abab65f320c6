//! Terminal rendering for occurrences and sync reports.

use calsync_core::{CommitReport, EventOccurrence, SyncFailure};
use chrono_tz::Tz;
use owo_colors::OwoColorize;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub trait Render {
    fn render(&self, tz: Tz) -> String;
}

impl Render for EventOccurrence {
    fn render(&self, tz: Tz) -> String {
        let start = self.start.with_timezone(&tz);
        let end = self.end.with_timezone(&tz);
        let time = if start.date_naive() == end.date_naive() {
            format!("{} - {}", start.format(TIME_FORMAT), end.format("%H:%M"))
        } else {
            format!("{} - {}", start.format(TIME_FORMAT), end.format(TIME_FORMAT))
        };

        let recurring = if self.series.is_recurring() { " ↻" } else { "" };
        format!(
            "{}  {}{}  {}",
            time,
            self.title.bold(),
            recurring,
            self.id.dimmed()
        )
    }
}

pub fn render_failure(failure: &SyncFailure) -> String {
    format!("{} {}", "!".yellow(), failure.to_string().yellow())
}

/// One line per outcome in a commit report.
pub fn render_commit(report: &CommitReport) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(id) = &report.created {
        lines.push(format!("{} {}", "+".green(), id));
    }
    for id in &report.updated {
        lines.push(format!("{} {}", "~".yellow(), id));
    }
    if let Some(key) = &report.excluded {
        lines.push(format!("{} {} (one occurrence)", "-".red(), key));
    }
    if let Some(id) = &report.deleted {
        lines.push(format!("{} {}", "-".red(), id));
    }
    for id in &report.skipped {
        lines.push(format!("  {} {}", id, "(not found, skipped)".dimmed()));
    }
    for id in &report.unattempted {
        lines.push(format!("  {} {}", id, "(not attempted)".dimmed()));
    }
    lines.extend(report.failures.iter().map(render_failure));

    lines
}
