//! Session ingestion pipeline.
//!
//! Fetches one session from the provider, normalizes it, and upserts one
//! result row per driver inside a single transaction. Row-level problems
//! never abort the batch: rows that cannot be linked to a driver are
//! skipped, and unexpected row failures are logged and counted. Only a
//! failed provider fetch fails the call.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::coerce;
use crate::laps::{aggregate_laps, LapStats};
use crate::provider::{RawRow, SessionProvider};
use crate::storage::repository::{upsert_session_result, SessionResultRecord};
use crate::storage::resolver::{resolve_driver, resolve_event, resolve_session, resolve_team};
use crate::storage::Repository;

/// Provenance tag stored on every session written by this pipeline.
pub const SOURCE_TAG: &str = "fastf1";

/// Driver identifier candidates, most authoritative first.
const DRIVER_ID_COLUMNS: [&str; 3] = ["Abbreviation", "Driver", "DriverNumber"];

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Result rows inserted or overwritten.
    pub written: usize,
    /// Rows with no resolvable driver identifier. Expected, not an error.
    pub skipped: usize,
    /// Rows dropped by an unexpected per-row failure.
    pub failed: usize,
}

enum RowOutcome {
    Written,
    SkippedNoDriver,
}

/// Ingest one session: fetch, normalize, and upsert, committing once.
///
/// Re-running with identical upstream data converges: the same
/// (session, driver) keys are overwritten, never duplicated. A session with
/// zero result rows still persists its event and session shells.
pub fn ingest_session<P: SessionProvider>(
    provider: &P,
    repo: &mut Repository,
    year: i32,
    round: i32,
    code: &str,
) -> Result<IngestReport> {
    let raw = provider
        .fetch_session(year, round, code)
        .with_context(|| format!("Failed to fetch session {}/{} {}", year, round, code))?;

    let lap_stats = aggregate_laps(raw.laps.as_ref());

    let tx = repo.transaction()?;

    let event_id = resolve_event(&tx, year, round, raw.event_name.as_deref().unwrap_or(""))?;
    let session_id = resolve_session(&tx, event_id, code, SOURCE_TAG)?;

    let mut report = IngestReport::default();
    for row in raw.results.rows() {
        match ingest_row(&tx, session_id, row, &lap_stats) {
            Ok(RowOutcome::Written) => report.written += 1,
            Ok(RowOutcome::SkippedNoDriver) => report.skipped += 1,
            Err(e) => {
                warn!(
                    "Dropping result row for {}/{} {}: {:#}",
                    year, round, code, e
                );
                report.failed += 1;
            }
        }
    }

    tx.commit()?;

    info!(
        "Ingested {}/{} {}: {} written, {} skipped, {} failed",
        year, round, code, report.written, report.skipped, report.failed
    );

    Ok(report)
}

/// Normalize and upsert one result row.
fn ingest_row(
    conn: &Connection,
    session_id: i64,
    row: &RawRow,
    lap_stats: &HashMap<String, LapStats>,
) -> Result<RowOutcome> {
    // Without a driver identifier the row cannot be linked to anything.
    let Some(driver_key) = driver_key(row) else {
        return Ok(RowOutcome::SkippedNoDriver);
    };

    let driver_name = coerce::to_str(row.field("FullName")).unwrap_or_default();
    let team_name = coerce::to_str(row.field("TeamName"))
        .or_else(|| coerce::to_str(row.field("Team")))
        .unwrap_or_default();

    let stats = lap_stats.get(&driver_key);

    let driver_id = resolve_driver(conn, &driver_key, &driver_name)?;
    let team_id = resolve_team(conn, &team_name)?;

    let rec = SessionResultRecord {
        session_id,
        driver_id,
        team_id,
        position: coerce::to_int(row.field("Position")),
        status: coerce::to_str(row.field("Status")),
        q1_sec: coerce::to_seconds(row.field("Q1")),
        q2_sec: coerce::to_seconds(row.field("Q2")),
        q3_sec: coerce::to_seconds(row.field("Q3")),
        best_lap_sec: stats.and_then(|s| s.best_lap_sec),
        laps: stats.map(|s| s.lap_count),
        main_compound: stats.and_then(|s| s.main_compound.clone()),
    };

    upsert_session_result(conn, &rec)?;
    Ok(RowOutcome::Written)
}

/// First non-empty driver identifier among the candidate columns.
fn driver_key(row: &RawRow) -> Option<String> {
    DRIVER_ID_COLUMNS
        .iter()
        .find_map(|column| coerce::to_str(row.field(column)))
}
