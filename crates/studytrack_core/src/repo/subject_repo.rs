//! Subject repository: upserts, lookups, live aggregates, and the
//! cascading delete that owns referential integrity.

use super::{RepoError, RepoResult};
use crate::model::{Subject, SubjectId};
use crate::store::{Collection, LiveQuery, Store};
use log::{error, info};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};

const SUBJECT_SELECT_SQL: &str = "SELECT id, name, goal_hours, colors FROM subjects";

/// Persistence operations for subjects.
#[derive(Clone)]
pub struct SubjectRepository {
    store: Store,
}

impl SubjectRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Inserts a new subject (`id == None`) or replaces an existing one by
    /// id. Returns the persisted id.
    pub fn upsert(&self, subject: &Subject) -> RepoResult<SubjectId> {
        subject.validate()?;
        let colors = colors_to_db(&subject.colors)?;

        let id = self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO subjects (id, name, goal_hours, colors)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    goal_hours = excluded.goal_hours,
                    colors = excluded.colors",
                params![subject.id, subject.name, subject.goal_hours, colors],
            )?;
            Ok(match subject.id {
                Some(id) => id,
                None => conn.last_insert_rowid(),
            })
        })?;

        self.store.notify(&[Collection::Subjects]);
        Ok(id)
    }

    pub fn get_by_id(&self, id: SubjectId) -> RepoResult<Option<Subject>> {
        let subject = self.store.with_conn(|conn| {
            conn.query_row(
                &format!("{SUBJECT_SELECT_SQL} WHERE id = ?1"),
                [id],
                parse_subject_row,
            )
            .optional()
        })?;
        Ok(subject)
    }

    /// Deletes a subject together with every task and session that
    /// references it.
    ///
    /// Dependents go first (tasks, then sessions, then the subject row)
    /// inside one immediate transaction: observers either see the full
    /// pre-delete state or none of the three collections containing the
    /// subject. A missing id is a successful no-op.
    pub fn delete_cascade(&self, id: SubjectId) -> RepoResult<()> {
        info!("event=subject_delete_cascade module=repo status=start subject_id={id}");

        let result = self.store.with_conn(|conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM tasks WHERE subject_id = ?1", [id])?;
            tx.execute("DELETE FROM sessions WHERE subject_id = ?1", [id])?;
            tx.execute("DELETE FROM subjects WHERE id = ?1", [id])?;
            tx.commit()
        });

        match result {
            Ok(()) => {
                info!("event=subject_delete_cascade module=repo status=ok subject_id={id}");
                self.store
                    .notify(&[Collection::Tasks, Collection::Sessions, Collection::Subjects]);
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=subject_delete_cascade module=repo status=error subject_id={id} error={err}"
                );
                Err(err.into())
            }
        }
    }

    pub fn observe_all(&self) -> LiveQuery<Vec<Subject>> {
        self.store.live(&[Collection::Subjects], |conn| {
            let mut stmt = conn.prepare(&format!("{SUBJECT_SELECT_SQL} ORDER BY id ASC"))?;
            let rows = stmt.query_map([], parse_subject_row)?;
            rows.collect()
        })
    }

    pub fn observe_count(&self) -> LiveQuery<i64> {
        self.store.live(&[Collection::Subjects], |conn| {
            conn.query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get(0))
        })
    }

    pub fn observe_goal_hours_sum(&self) -> LiveQuery<f64> {
        self.store.live(&[Collection::Subjects], |conn| {
            conn.query_row("SELECT COALESCE(SUM(goal_hours), 0.0) FROM subjects", [], |row| {
                row.get(0)
            })
        })
    }
}

fn parse_subject_row(row: &Row<'_>) -> rusqlite::Result<Subject> {
    let colors_text: String = row.get("colors")?;
    Ok(Subject {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        goal_hours: row.get("goal_hours")?,
        colors: colors_from_db(&colors_text)?,
    })
}

fn colors_to_db(colors: &[i64]) -> RepoResult<String> {
    serde_json::to_string(colors)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode colors: {err}")))
}

fn colors_from_db(text: &str) -> rusqlite::Result<Vec<i64>> {
    serde_json::from_str(text).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err))
    })
}
