//! HTTP client for the session data service.
//!
//! Documents are fetched through the on-disk cache with retry on network
//! failure. Payload shapes drift across seasons: session documents are
//! either a bare row array or an object wrapping the rows, so both forms
//! are accepted.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::coerce;
use crate::retry::{retry, RetryConfig};

use super::cache::{Cache, CacheCategory};
use super::{
    laps_url, results_url, schedule_url, RawSession, RawTable, ScheduleEntry, SessionProvider,
};

/// Blocking HTTP provider
pub struct HttpProvider {
    base_url: String,
    client: reqwest::blocking::Client,
    cache: Cache,
    retry: RetryConfig,
}

impl HttpProvider {
    /// Create a provider against a base URL, caching under `cache_dir`
    pub fn new(base_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pitwall/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            cache: Cache::new(cache_dir.into()),
            retry: RetryConfig::network(),
        })
    }

    /// Fetch a JSON document through the cache
    fn fetch_json(&self, category: CacheCategory, key: &str, url: &str) -> Result<Value> {
        if let Some(cached) = self.cache.get(category, key) {
            return Ok(cached);
        }

        let value: Value = retry(&self.retry, url, || -> Result<Value> {
            let response = self.client.get(url).send()?.error_for_status()?;
            Ok(response.json()?)
        })?;

        if let Err(e) = self.cache.set(category, key, &value) {
            warn!("Failed to cache response for {}: {}", key, e);
        }

        Ok(value)
    }
}

impl SessionProvider for HttpProvider {
    fn fetch_session(&self, year: i32, round: i32, code: &str) -> Result<RawSession> {
        let key = format!("{}_{}_{}_results", year, round, code);
        let doc = self
            .fetch_json(
                CacheCategory::Session,
                &key,
                &results_url(&self.base_url, year, round, code),
            )
            .with_context(|| format!("Failed to fetch results for {}/{} {}", year, round, code))?;
        let (event_name, results) = parse_session_document(doc);

        // A failed lap fetch is not fatal: the session is stored without
        // derived lap statistics.
        let lap_key = format!("{}_{}_{}_laps", year, round, code);
        let laps = match self.fetch_json(
            CacheCategory::Session,
            &lap_key,
            &laps_url(&self.base_url, year, round, code),
        ) {
            Ok(doc) => Some(parse_lap_document(doc)),
            Err(e) => {
                warn!("Lap data unavailable for {}/{} {}: {}", year, round, code, e);
                None
            }
        };

        Ok(RawSession {
            event_name,
            results,
            laps,
        })
    }

    fn fetch_event_schedule(&self, year: i32) -> Result<Vec<ScheduleEntry>> {
        let doc = self
            .fetch_json(
                CacheCategory::Schedule,
                &year.to_string(),
                &schedule_url(&self.base_url, year),
            )
            .with_context(|| format!("Failed to fetch event schedule for {}", year))?;

        let table = match doc {
            Value::Object(ref map) => map
                .get("Schedule")
                .cloned()
                .map(table_from)
                .unwrap_or_default(),
            other => table_from(other),
        };

        Ok(schedule_entries(&table))
    }
}

/// Split a session results document into event name and result rows
fn parse_session_document(doc: Value) -> (Option<String>, RawTable) {
    match doc {
        Value::Array(_) => (None, table_from(doc)),
        Value::Object(ref map) => {
            let name = coerce::to_str(map.get("EventName"));
            let results = map
                .get("Results")
                .cloned()
                .map(table_from)
                .unwrap_or_default();
            (name, results)
        }
        _ => (None, RawTable::default()),
    }
}

/// Extract lap rows from a lap document
fn parse_lap_document(doc: Value) -> RawTable {
    match doc {
        Value::Array(_) => table_from(doc),
        Value::Object(ref map) => map.get("Laps").cloned().map(table_from).unwrap_or_default(),
        _ => RawTable::default(),
    }
}

fn table_from(value: Value) -> RawTable {
    serde_json::from_value(value).unwrap_or_default()
}

/// Map schedule rows to ordered entries, skipping rows without a round
fn schedule_entries(table: &RawTable) -> Vec<ScheduleEntry> {
    table
        .rows()
        .filter_map(|row| {
            let round = coerce::to_int(row.field("RoundNumber"))?;
            let name = coerce::to_str(row.field("EventName"))
                .or_else(|| coerce::to_str(row.field("OfficialEventName")))
                .unwrap_or_else(|| format!("Round {}", round));
            Some(ScheduleEntry { round, name })
        })
        .collect()
}
