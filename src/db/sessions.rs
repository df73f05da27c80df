use crate::db::connection::Database;
use crate::domain::session::{IngestionSession, SessionStatus, SessionUpdate};
use crate::errors::StorageError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

pub fn start_session(
    db: &Database,
    source: &str,
    now: DateTime<Utc>,
) -> Result<i64, StorageError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO ingestion_sessions (source, started_at, status) VALUES (?1, ?2, 'running')",
            params![source, now],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Close a running session. A session is finalized exactly once; closing an
/// unknown or already closed session is an error.
pub fn finish_session(
    db: &Database,
    session_id: i64,
    update: &SessionUpdate,
) -> Result<(), StorageError> {
    let changed = db.with_conn(|conn| {
        Ok(conn.execute(
            "UPDATE ingestion_sessions
             SET finished_at = ?1, scraped = ?2, saved = ?3, duplicates = ?4, errors = ?5,
                 status = ?6, error_message = ?7
             WHERE id = ?8 AND status = 'running'",
            params![
                update.finished_at,
                update.scraped,
                update.saved,
                update.duplicates,
                update.errors,
                update.status.as_str(),
                update.error_message,
                session_id,
            ],
        )?)
    })?;

    if changed == 0 {
        return Err(StorageError::Corrupt(format!(
            "session {session_id} is not running"
        )));
    }
    Ok(())
}

pub fn recent_sessions(db: &Database, limit: u32) -> Result<Vec<IngestionSession>, StorageError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, source, started_at, finished_at, scraped, saved, duplicates, errors,
                    status, error_message
             FROM ingestion_sessions
             ORDER BY started_at DESC, id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok((session_from_row(row)?, row.get::<_, String>(8)?))
        })?;

        let mut sessions = Vec::new();
        for r in rows {
            let (mut session, status) = r?;
            session.status = SessionStatus::parse(&status).ok_or_else(|| {
                StorageError::Corrupt(format!("session {} has status '{status}'", session.id))
            })?;
            sessions.push(session);
        }
        Ok(sessions)
    })
}

// Status is filled in by the caller, which can report a bad value properly.
fn session_from_row(row: &Row<'_>) -> rusqlite::Result<IngestionSession> {
    Ok(IngestionSession {
        id: row.get(0)?,
        source: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        scraped: row.get(4)?,
        saved: row.get(5)?,
        duplicates: row.get(6)?,
        errors: row.get(7)?,
        status: SessionStatus::Running,
        error_message: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
        db
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn done(status: SessionStatus, hour: u32) -> SessionUpdate {
        SessionUpdate {
            status,
            finished_at: at(hour),
            scraped: 40,
            saved: 30,
            duplicates: 8,
            errors: 2,
            error_message: None,
        }
    }

    #[test]
    fn session_lifecycle() {
        let db = db();
        let id = start_session(&db, "zameen.com", at(1)).unwrap();

        let running = recent_sessions(&db, 10).unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].status, SessionStatus::Running);
        assert_eq!(running[0].finished_at, None);

        finish_session(&db, id, &done(SessionStatus::Completed, 2)).unwrap();

        let s = &recent_sessions(&db, 10).unwrap()[0];
        assert_eq!(s.id, id);
        assert_eq!(s.source, "zameen.com");
        assert_eq!(s.started_at, at(1));
        assert_eq!(s.finished_at, Some(at(2)));
        assert_eq!((s.scraped, s.saved, s.duplicates, s.errors), (40, 30, 8, 2));
        assert_eq!(s.status, SessionStatus::Completed);
    }

    #[test]
    fn sessions_are_finalized_once() {
        let db = db();
        let id = start_session(&db, "s", at(1)).unwrap();
        finish_session(&db, id, &done(SessionStatus::Failed, 2)).unwrap();

        let again = finish_session(&db, id, &done(SessionStatus::Completed, 3));
        assert!(matches!(again, Err(StorageError::Corrupt(_))));
        assert!(finish_session(&db, 999, &done(SessionStatus::Completed, 3)).is_err());

        assert_eq!(recent_sessions(&db, 1).unwrap()[0].status, SessionStatus::Failed);
    }

    #[test]
    fn recent_sessions_newest_first() {
        let db = db();
        start_session(&db, "a", at(1)).unwrap();
        start_session(&db, "b", at(3)).unwrap();
        start_session(&db, "c", at(2)).unwrap();

        let sources: Vec<_> = recent_sessions(&db, 2)
            .unwrap()
            .into_iter()
            .map(|s| s.source)
            .collect();
        assert_eq!(sources, ["b", "c"]);
    }
}
