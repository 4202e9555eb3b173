//! SQLite repository for normalized session data

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;

use super::{is_constraint_violation, schema::create_tables};
use crate::types::SessionResultRow;

/// Owns the database connection for one unit of work: an ingestion pass
/// or an API query.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    /// Open a repository, initializing the database if needed
    pub fn open(db_path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(db_path).context("Failed to open database")?;

        // Enable foreign keys
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        // Create tables if they don't exist
        create_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Create an in-memory repository (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    /// Begin the transaction scoping one ingestion pass
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Stored results for a session, position order with unclassified last.
    /// An unknown session reads as an empty result set.
    pub fn session_results(
        &self,
        year: i32,
        round: i32,
        code: &str,
        source: &str,
    ) -> Result<Vec<SessionResultRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT r.position, d.code, COALESCE(t.name, ''), r.status,
                   r.q1_sec, r.q2_sec, r.q3_sec, r.best_lap_sec, r.laps, r.main_compound
            FROM session_results r
            JOIN sessions s ON s.id = r.session_id
            JOIN events e ON e.id = s.event_id
            JOIN drivers d ON d.id = r.driver_id
            LEFT JOIN teams t ON t.id = r.team_id
            WHERE e.year = ?1 AND e.round = ?2 AND s.code = ?3 AND s.source = ?4
            ORDER BY r.position IS NULL, r.position ASC
            "#,
        )?;

        let rows = stmt
            .query_map(params![year, round, code, source], |row| {
                Ok(SessionResultRow {
                    position: row.get(0)?,
                    driver: row.get(1)?,
                    team: row.get(2)?,
                    status: row.get(3)?,
                    q1: row.get(4)?,
                    q2: row.get(5)?,
                    q3: row.get(6)?,
                    best_lap: row.get(7)?,
                    laps: row.get(8)?,
                    main_compound: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

/// One fully-coerced session result, keyed by (session, driver)
#[derive(Debug, Clone, Default)]
pub struct SessionResultRecord {
    pub session_id: i64,
    pub driver_id: i64,
    pub team_id: Option<i64>,
    pub position: Option<i64>,
    pub status: Option<String>,
    pub q1_sec: Option<f64>,
    pub q2_sec: Option<f64>,
    pub q3_sec: Option<f64>,
    pub best_lap_sec: Option<f64>,
    pub laps: Option<i64>,
    pub main_compound: Option<String>,
}

/// Upsert a session result on (session_id, driver_id).
///
/// Every payload field is overwritten on update, so re-ingestion and
/// duplicate raw rows both converge to the latest values. Losing an insert
/// race to a concurrent ingestion is recovered by overwriting the row the
/// other writer created.
pub fn upsert_session_result(conn: &Connection, rec: &SessionResultRecord) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM session_results WHERE session_id = ?1 AND driver_id = ?2",
            params![rec.session_id, rec.driver_id],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to look up session result")?;

    if let Some(id) = existing {
        return update_session_result(conn, id, rec);
    }

    let inserted = conn.execute(
        r#"
        INSERT INTO session_results
        (session_id, driver_id, team_id, position, status,
         q1_sec, q2_sec, q3_sec, best_lap_sec, laps, main_compound)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            rec.session_id,
            rec.driver_id,
            rec.team_id,
            rec.position,
            rec.status,
            rec.q1_sec,
            rec.q2_sec,
            rec.q3_sec,
            rec.best_lap_sec,
            rec.laps,
            rec.main_compound,
        ],
    );

    match inserted {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => {
            let conflicting: Option<i64> = conn
                .query_row(
                    "SELECT id FROM session_results WHERE session_id = ?1 AND driver_id = ?2",
                    params![rec.session_id, rec.driver_id],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to re-read session result after insert race")?;

            match conflicting {
                Some(id) => update_session_result(conn, id, rec),
                // Not a uniqueness race on our key; surface the original error
                None => Err(e).context("Failed to insert session result"),
            }
        }
        Err(e) => Err(e).context("Failed to insert session result"),
    }
}

fn update_session_result(conn: &Connection, id: i64, rec: &SessionResultRecord) -> Result<()> {
    conn.execute(
        r#"
        UPDATE session_results
        SET team_id = ?1, position = ?2, status = ?3,
            q1_sec = ?4, q2_sec = ?5, q3_sec = ?6,
            best_lap_sec = ?7, laps = ?8, main_compound = ?9
        WHERE id = ?10
        "#,
        params![
            rec.team_id,
            rec.position,
            rec.status,
            rec.q1_sec,
            rec.q2_sec,
            rec.q3_sec,
            rec.best_lap_sec,
            rec.laps,
            rec.main_compound,
            id,
        ],
    )
    .context("Failed to update session result")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::resolver::{resolve_driver, resolve_event, resolve_session, resolve_team};

    fn seed(repo: &Repository) -> (i64, i64) {
        let conn = repo.connection();
        let event_id = resolve_event(conn, 2024, 5, "Monaco Grand Prix").unwrap();
        let session_id = resolve_session(conn, event_id, "R", "fastf1").unwrap();
        let driver_id = resolve_driver(conn, "VER", "Max Verstappen").unwrap();
        (session_id, driver_id)
    }

    fn result_count(repo: &Repository) -> i64 {
        repo.connection()
            .query_row("SELECT COUNT(*) FROM session_results", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_upsert_inserts_then_overwrites() {
        let repo = Repository::in_memory().unwrap();
        let (session_id, driver_id) = seed(&repo);

        let mut rec = SessionResultRecord {
            session_id,
            driver_id,
            position: Some(2),
            status: Some("Finished".into()),
            best_lap_sec: Some(78.4),
            laps: Some(57),
            ..Default::default()
        };
        upsert_session_result(repo.connection(), &rec).unwrap();
        assert_eq!(result_count(&repo), 1);

        rec.position = Some(1);
        rec.best_lap_sec = Some(77.9);
        upsert_session_result(repo.connection(), &rec).unwrap();
        assert_eq!(result_count(&repo), 1);

        let rows = repo.session_results(2024, 5, "R", "fastf1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].position, Some(1));
        assert_eq!(rows[0].best_lap, Some(77.9));
        assert_eq!(rows[0].driver, "VER");
    }

    #[test]
    fn test_upsert_overwrite_clears_stale_fields() {
        let repo = Repository::in_memory().unwrap();
        let (session_id, driver_id) = seed(&repo);
        let team_id = resolve_team(repo.connection(), "Red Bull Racing").unwrap();

        let rec = SessionResultRecord {
            session_id,
            driver_id,
            team_id,
            q1_sec: Some(71.2),
            main_compound: Some("SOFT".into()),
            ..Default::default()
        };
        upsert_session_result(repo.connection(), &rec).unwrap();

        let bare = SessionResultRecord {
            session_id,
            driver_id,
            ..Default::default()
        };
        upsert_session_result(repo.connection(), &bare).unwrap();

        let rows = repo.session_results(2024, 5, "R", "fastf1").unwrap();
        assert_eq!(rows[0].q1, None);
        assert_eq!(rows[0].main_compound, None);
        assert_eq!(rows[0].team, "");
    }

    #[test]
    fn test_results_ordered_with_unclassified_last() {
        let repo = Repository::in_memory().unwrap();
        let conn = repo.connection();
        let event_id = resolve_event(conn, 2024, 5, "").unwrap();
        let session_id = resolve_session(conn, event_id, "R", "fastf1").unwrap();

        for (code, position) in [("NOR", Some(2)), ("VER", Some(1)), ("ALO", None)] {
            let driver_id = resolve_driver(conn, code, "").unwrap();
            let rec = SessionResultRecord {
                session_id,
                driver_id,
                position,
                ..Default::default()
            };
            upsert_session_result(conn, &rec).unwrap();
        }

        let rows = repo.session_results(2024, 5, "R", "fastf1").unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r.driver.as_str()).collect();
        assert_eq!(order, vec!["VER", "NOR", "ALO"]);
    }

    #[test]
    fn test_unknown_session_reads_empty() {
        let repo = Repository::in_memory().unwrap();
        let rows = repo.session_results(1999, 1, "R", "fastf1").unwrap();
        assert!(rows.is_empty());
    }
}
