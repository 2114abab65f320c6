mod commands;
mod render;
mod store;
mod when;

use anyhow::{Context, Result};
use calsync_core::config::SyncConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "calsync")]
#[command(about = "List and edit recurring calendar events kept in a document store")]
struct Cli {
    /// Log sync activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every event and print its occurrences
    List {
        /// Print occurrences as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new event
    Add {
        title: String,

        /// Start date/time (e.g., "2025-03-20T15:00" or "2025-03-20")
        #[arg(short, long)]
        start: String,

        /// End date/time
        #[arg(short, long, conflicts_with = "duration")]
        end: Option<String>,

        /// Duration (e.g., "30m", "1h", "2h 30m")
        #[arg(short, long, conflicts_with = "end")]
        duration: Option<String>,

        /// Recurrence rule (e.g., "FREQ=WEEKLY;COUNT=10")
        #[arg(long)]
        rrule: Option<String>,

        /// Excluded occurrence starts (e.g., "20250311T180000Z,20250318T180000Z")
        #[arg(long)]
        exdate: Option<String>,
    },
    /// Change fields of an existing event
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        start: Option<String>,

        #[arg(short, long)]
        end: Option<String>,

        /// New recurrence rule ("" makes the event non-recurring)
        #[arg(long)]
        rrule: Option<String>,

        /// New exclusion dates ("" clears them)
        #[arg(long)]
        exdate: Option<String>,
    },
    /// Delete an event, or a single occurrence of a recurring event
    Delete {
        id: String,

        /// Start of the one occurrence to remove
        #[arg(long)]
        occurrence: Option<String>,
    },
    /// Apply a JSON change set read from stdin
    Commit,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = SyncConfig::load().context("Failed to load config")?;

    match cli.command {
        Commands::List { json } => commands::list::run(&config, json).await,
        Commands::Add {
            title,
            start,
            end,
            duration,
            rrule,
            exdate,
        } => commands::add::run(&config, title, start, end, duration, rrule, exdate).await,
        Commands::Update {
            id,
            title,
            start,
            end,
            rrule,
            exdate,
        } => commands::update::run(&config, &id, title, start, end, rrule, exdate).await,
        Commands::Delete { id, occurrence } => {
            commands::delete::run(&config, &id, occurrence.as_deref()).await
        }
        Commands::Commit => commands::commit::run(&config).await,
    }
}
