//! CLI commands for pitwall.
//!
//! Supports API server mode plus one-shot ingestion and schedule lookups.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::ingest::{ingest_session, IngestReport};
use crate::provider::{HttpProvider, SessionProvider};
use crate::storage::Repository;

#[derive(Parser)]
#[command(name = "pitwall")]
#[command(version, about = "Pitwall: motorsport session telemetry API and CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },

    /// Ingest one session into the database
    Load {
        /// Season year
        year: i32,

        /// Round number within the season
        round: i32,

        /// Session code (FP1, FP2, FP3, Q, SQ, S, R)
        session: String,
    },

    /// Print the event schedule for a year
    Schedule {
        /// Season year
        year: i32,
    },
}

/// Run one ingestion in-process and print the report.
pub async fn run_load(year: i32, round: i32, session: String) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let provider = HttpProvider::new(
        config.provider.base_url.as_str(),
        config.provider.cache_dir.as_str(),
    )?;
    let db_path = PathBuf::from(&config.database.path);

    eprintln!("Loading session {}/{} {}...", year, round, session);

    let report = tokio::task::spawn_blocking(move || -> anyhow::Result<IngestReport> {
        let mut repo = Repository::open(&db_path)?;
        ingest_session(&provider, &mut repo, year, round, &session)
    })
    .await??;

    println!(
        "{} written, {} skipped, {} failed",
        report.written, report.skipped, report.failed
    );

    Ok(())
}

/// Print the event schedule for a year.
pub async fn run_schedule(year: i32) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let provider = HttpProvider::new(
        config.provider.base_url.as_str(),
        config.provider.cache_dir.as_str(),
    )?;

    let entries =
        tokio::task::spawn_blocking(move || provider.fetch_event_schedule(year)).await??;

    if entries.is_empty() {
        eprintln!("No events scheduled for {}", year);
        return Ok(());
    }

    for entry in entries {
        println!("{:>2}  {}", entry.round, entry.name);
    }

    Ok(())
}
