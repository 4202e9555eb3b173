//! SQLite schema definitions for normalized session data
//!
//! Tables:
//! - events: One row per (year, round)
//! - sessions: Sessions of an event, per data source
//! - drivers: Drivers, globally unique by short code
//! - teams: Teams, globally unique by name
//! - session_results: Per-driver results and derived lap statistics

use rusqlite::{Connection, Result};

/// Create all tables in the database
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            year INTEGER NOT NULL,
            round INTEGER NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            UNIQUE(year, round)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL REFERENCES events(id),
            code TEXT NOT NULL,
            source TEXT NOT NULL,
            UNIQUE(event_id, code, source)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS drivers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            UNIQUE(code)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            UNIQUE(name)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS session_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL REFERENCES sessions(id),
            driver_id INTEGER NOT NULL REFERENCES drivers(id),
            team_id INTEGER REFERENCES teams(id),
            position INTEGER,
            status TEXT,
            q1_sec REAL,
            q2_sec REAL,
            q3_sec REAL,
            best_lap_sec REAL,
            laps INTEGER,
            main_compound TEXT,
            UNIQUE(session_id, driver_id)
        )
        "#,
        [],
    )?;

    // Create indexes for common queries
    conn.execute(
        "CREATE INDEX IF NOT EXISTS ix_events_year_round ON events(year, round)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS ix_sessions_event_code_source ON sessions(event_id, code, source)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS ix_drivers_code ON drivers(code)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS ix_teams_name ON teams(name)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS ix_session_results_session ON session_results(session_id)",
        [],
    )?;

    Ok(())
}
