//! Identity resolution: get-or-create with name refinement.
//!
//! Each resolver looks an entity up by its natural key and creates it on
//! first sight. Display names refine in place: a stored name is overwritten
//! only when the newly seen one is non-empty and different, and is never
//! cleared. The functions take a plain `Connection` so they compose with
//! the ingestion transaction (`Transaction` derefs to `Connection`).
//!
//! A lost insert race against a concurrent ingestion surfaces as a
//! uniqueness violation; resolution falls back to re-reading the row the
//! other writer created.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::is_constraint_violation;

/// Refinement policy shared by events and drivers.
fn should_refine(stored: &str, candidate: &str) -> bool {
    !candidate.is_empty() && stored != candidate
}

/// Resolve an event by (year, round), creating or refining as needed.
pub fn resolve_event(conn: &Connection, year: i32, round: i32, candidate_name: &str) -> Result<i64> {
    let existing: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, name FROM events WHERE year = ?1 AND round = ?2",
            params![year, round],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .context("Failed to look up event")?;

    if let Some((id, stored)) = existing {
        if should_refine(&stored, candidate_name) {
            conn.execute(
                "UPDATE events SET name = ?1 WHERE id = ?2",
                params![candidate_name, id],
            )
            .context("Failed to refine event name")?;
        }
        return Ok(id);
    }

    match conn.execute(
        "INSERT INTO events (year, round, name) VALUES (?1, ?2, ?3)",
        params![year, round, candidate_name],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_constraint_violation(&e) => conn
            .query_row(
                "SELECT id FROM events WHERE year = ?1 AND round = ?2",
                params![year, round],
                |row| row.get(0),
            )
            .context("Failed to re-read event after insert race"),
        Err(e) => Err(e).context("Failed to insert event"),
    }
}

/// Resolve a session by (event, code, source), creating if needed.
pub fn resolve_session(conn: &Connection, event_id: i64, code: &str, source: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM sessions WHERE event_id = ?1 AND code = ?2 AND source = ?3",
            params![event_id, code, source],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to look up session")?;

    if let Some(id) = existing {
        return Ok(id);
    }

    match conn.execute(
        "INSERT INTO sessions (event_id, code, source) VALUES (?1, ?2, ?3)",
        params![event_id, code, source],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_constraint_violation(&e) => conn
            .query_row(
                "SELECT id FROM sessions WHERE event_id = ?1 AND code = ?2 AND source = ?3",
                params![event_id, code, source],
                |row| row.get(0),
            )
            .context("Failed to re-read session after insert race"),
        Err(e) => Err(e).context("Failed to insert session"),
    }
}

/// Resolve a driver by short code, creating or refining as needed.
/// Callers must not pass an empty code; rows without one are skipped upstream.
pub fn resolve_driver(conn: &Connection, code: &str, candidate_name: &str) -> Result<i64> {
    let existing: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, name FROM drivers WHERE code = ?1",
            params![code],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .context("Failed to look up driver")?;

    if let Some((id, stored)) = existing {
        if should_refine(&stored, candidate_name) {
            conn.execute(
                "UPDATE drivers SET name = ?1 WHERE id = ?2",
                params![candidate_name, id],
            )
            .context("Failed to refine driver name")?;
        }
        return Ok(id);
    }

    match conn.execute(
        "INSERT INTO drivers (code, name) VALUES (?1, ?2)",
        params![code, candidate_name],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_constraint_violation(&e) => conn
            .query_row(
                "SELECT id FROM drivers WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .context("Failed to re-read driver after insert race"),
        Err(e) => Err(e).context("Failed to insert driver"),
    }
}

/// Resolve a team by name. An empty name means no team reference at all,
/// never a placeholder row.
pub fn resolve_team(conn: &Connection, name: &str) -> Result<Option<i64>> {
    if name.is_empty() {
        return Ok(None);
    }

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM teams WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to look up team")?;

    if let Some(id) = existing {
        return Ok(Some(id));
    }

    match conn.execute("INSERT INTO teams (name) VALUES (?1)", params![name]) {
        Ok(_) => Ok(Some(conn.last_insert_rowid())),
        Err(e) if is_constraint_violation(&e) => conn
            .query_row(
                "SELECT id FROM teams WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to re-read team after insert race"),
        Err(e) => Err(e).context("Failed to insert team"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::create_tables;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn event_name(conn: &Connection, id: i64) -> String {
        conn.query_row("SELECT name FROM events WHERE id = ?1", [id], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_resolve_event_creates_then_reuses() {
        let conn = test_conn();

        let id = resolve_event(&conn, 2024, 5, "").unwrap();
        let again = resolve_event(&conn, 2024, 5, "").unwrap();
        assert_eq!(id, again);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_resolve_event_refines_name_in_place() {
        let conn = test_conn();

        let id = resolve_event(&conn, 2024, 5, "").unwrap();
        assert_eq!(event_name(&conn, id), "");

        let again = resolve_event(&conn, 2024, 5, "Monaco Grand Prix").unwrap();
        assert_eq!(id, again);
        assert_eq!(event_name(&conn, id), "Monaco Grand Prix");

        // An absent name on a later sight does not clear the stored one
        resolve_event(&conn, 2024, 5, "").unwrap();
        assert_eq!(event_name(&conn, id), "Monaco Grand Prix");
    }

    #[test]
    fn test_resolve_session_unique_per_event_code_source() {
        let conn = test_conn();
        let event_id = resolve_event(&conn, 2024, 5, "").unwrap();

        let a = resolve_session(&conn, event_id, "Q", "fastf1").unwrap();
        let b = resolve_session(&conn, event_id, "Q", "fastf1").unwrap();
        let c = resolve_session(&conn, event_id, "R", "fastf1").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_resolve_driver_idempotent_and_refines() {
        let conn = test_conn();

        let id = resolve_driver(&conn, "VER", "").unwrap();
        let again = resolve_driver(&conn, "VER", "Max Verstappen").unwrap();
        assert_eq!(id, again);

        let name: String = conn
            .query_row("SELECT name FROM drivers WHERE id = ?1", [id], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(name, "Max Verstappen");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM drivers", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_resolve_team_empty_name_is_absent() {
        let conn = test_conn();

        assert_eq!(resolve_team(&conn, "").unwrap(), None);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM teams", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_resolve_team_by_exact_name() {
        let conn = test_conn();

        let a = resolve_team(&conn, "Red Bull Racing").unwrap();
        let b = resolve_team(&conn, "Red Bull Racing").unwrap();
        let c = resolve_team(&conn, "Ferrari").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.is_some());
    }
}
