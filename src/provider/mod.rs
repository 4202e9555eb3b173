//! Session data provider.
//!
//! The upstream service exposes per-session result and lap tables plus a
//! yearly event schedule as JSON documents. Column availability varies by
//! season and session type, so rows are column-addressable maps probed for
//! presence rather than deserialized into a fixed schema.

pub mod cache;
pub mod http;

pub use http::HttpProvider;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One loosely-typed row of a provider table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RawRow {
    cells: Map<String, Value>,
}

impl RawRow {
    /// Probe for a column. Absent columns read as `None`; the coercion
    /// layer treats present-but-null cells the same way.
    pub fn field(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }
}

/// A provider result set: zero or more rows sharing no guaranteed columns.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RawTable {
    rows: Vec<RawRow>,
}

impl RawTable {
    pub fn rows(&self) -> impl Iterator<Item = &RawRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Everything the provider returns for one session.
#[derive(Debug, Clone)]
pub struct RawSession {
    /// Display name of the event, when the payload carries one.
    pub event_name: Option<String>,
    /// Per-driver result rows.
    pub results: RawTable,
    /// Per-lap rows; `None` when the lap fetch failed or the session has none.
    pub laps: Option<RawTable>,
}

/// One round of the yearly event schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub round: i64,
    pub name: String,
}

/// Source of raw session data for the ingestion pipeline.
pub trait SessionProvider {
    /// Fetch results and laps for one session. Fatal on failure; a failed
    /// lap fetch alone degrades to `laps: None` instead.
    fn fetch_session(&self, year: i32, round: i32, code: &str) -> Result<RawSession>;

    /// Fetch the ordered event schedule for a year.
    fn fetch_event_schedule(&self, year: i32) -> Result<Vec<ScheduleEntry>>;
}

/// Build the schedule document URL for a year.
pub fn schedule_url(base: &str, year: i32) -> String {
    format!("{}/schedule/{}.json", base, year)
}

/// Build the session results document URL.
pub fn results_url(base: &str, year: i32, round: i32, code: &str) -> String {
    format!("{}/sessions/{}/{}/{}/results.json", base, year, round, code)
}

/// Build the session laps document URL.
pub fn laps_url(base: &str, year: i32, round: i32, code: &str) -> String {
    format!("{}/sessions/{}/{}/{}/laps.json", base, year, round, code)
}
