//! Study session repository.
//!
//! Sessions are insert-and-delete only; there is no update path. Duration
//! totals are always derived through aggregate live queries, never stored.

use super::RepoResult;
use crate::model::{Session, SessionId, SubjectId};
use crate::store::{Collection, LiveQuery, Store};
use rusqlite::{params, Row};

const SESSION_SELECT_SQL: &str =
    "SELECT id, subject_id, timestamp, duration_seconds FROM sessions";

/// Newest sessions first; ties break on insertion order.
const SESSION_ORDER_SQL: &str = "ORDER BY timestamp DESC, id DESC";

/// Persistence operations for sessions.
#[derive(Clone)]
pub struct SessionRepository {
    store: Store,
}

impl SessionRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Inserts a new session. Sessions below the minimum duration are
    /// rejected here, before any SQL runs.
    pub fn insert(&self, session: &Session) -> RepoResult<SessionId> {
        session.validate()?;

        let id = self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (subject_id, timestamp, duration_seconds)
                 VALUES (?1, ?2, ?3)",
                params![session.subject_id, session.timestamp, session.duration_seconds],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        self.store.notify(&[Collection::Sessions]);
        Ok(id)
    }

    /// Deletes by id. Deleting a missing session is a successful no-op.
    pub fn delete_by_id(&self, id: SessionId) -> RepoResult<()> {
        let changed = self
            .store
            .with_conn(|conn| conn.execute("DELETE FROM sessions WHERE id = ?1", [id]))?;
        if changed > 0 {
            self.store.notify(&[Collection::Sessions]);
        }
        Ok(())
    }

    pub fn observe_all(&self) -> LiveQuery<Vec<Session>> {
        self.store.live(&[Collection::Sessions], |conn| {
            let mut stmt = conn.prepare(&format!("{SESSION_SELECT_SQL} {SESSION_ORDER_SQL}"))?;
            let rows = stmt.query_map([], parse_session_row)?;
            rows.collect()
        })
    }

    /// The `limit` most recent sessions across all subjects.
    pub fn observe_recent(&self, limit: u32) -> LiveQuery<Vec<Session>> {
        self.store.live(&[Collection::Sessions], move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SESSION_SELECT_SQL} {SESSION_ORDER_SQL} LIMIT ?1"
            ))?;
            let rows = stmt.query_map([limit], parse_session_row)?;
            rows.collect()
        })
    }

    /// The `limit` most recent sessions for one subject.
    pub fn observe_for_subject(
        &self,
        subject_id: SubjectId,
        limit: u32,
    ) -> LiveQuery<Vec<Session>> {
        self.store.live(&[Collection::Sessions], move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SESSION_SELECT_SQL} WHERE subject_id = ?1 {SESSION_ORDER_SQL} LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![subject_id, limit], parse_session_row)?;
            rows.collect()
        })
    }

    /// Total studied seconds across all subjects.
    pub fn observe_total_duration(&self) -> LiveQuery<i64> {
        self.store.live(&[Collection::Sessions], |conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(duration_seconds), 0) FROM sessions",
                [],
                |row| row.get(0),
            )
        })
    }

    /// Total studied seconds for one subject. Always the sum over the
    /// subject's stored sessions, recomputed on every insert and delete.
    pub fn observe_total_duration_for_subject(&self, subject_id: SubjectId) -> LiveQuery<i64> {
        self.store.live(&[Collection::Sessions], move |conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(duration_seconds), 0) FROM sessions WHERE subject_id = ?1",
                [subject_id],
                |row| row.get(0),
            )
        })
    }
}

fn parse_session_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: Some(row.get("id")?),
        subject_id: row.get("subject_id")?,
        timestamp: row.get("timestamp")?,
        duration_seconds: row.get("duration_seconds")?,
    })
}
