//! SQLite storage for normalized session data
//!
//! Tables hold the relational form of ingested sessions: events, sessions,
//! drivers, teams, and the per-driver session_results fact table.

pub mod repository;
pub mod resolver;
pub mod schema;

pub use repository::Repository;
pub use schema::create_tables;

/// True when an error is a SQLite constraint violation. Uniqueness races
/// between concurrent ingestions surface this way and are recovered by
/// re-reading the conflicting row.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_constraint_violation_detection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (v TEXT UNIQUE)", []).unwrap();
        conn.execute("INSERT INTO t (v) VALUES ('x')", []).unwrap();

        let err = conn
            .execute("INSERT INTO t (v) VALUES ('x')", [])
            .unwrap_err();
        assert!(is_constraint_violation(&err));

        let err = conn.execute("INSERT INTO missing (v) VALUES ('x')", []);
        assert!(!is_constraint_violation(&err.unwrap_err()));
    }
}
