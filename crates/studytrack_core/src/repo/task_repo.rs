//! Task repository.

use super::RepoResult;
use crate::model::{Priority, SubjectId, Task, TaskId};
use crate::store::{Collection, LiveQuery, Store};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

const TASK_SELECT_SQL: &str =
    "SELECT id, subject_id, title, description, due_date, priority, complete FROM tasks";

/// Consumers render tasks soonest-due first; ties break on insertion order.
const TASK_ORDER_SQL: &str = "ORDER BY due_date ASC, id ASC";

/// Persistence operations for tasks.
#[derive(Clone)]
pub struct TaskRepository {
    store: Store,
}

impl TaskRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Inserts a new task (`id == None`) or replaces an existing one by id.
    /// Returns the persisted id.
    pub fn upsert(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;

        let id = self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, subject_id, title, description, due_date, priority, complete)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    subject_id = excluded.subject_id,
                    title = excluded.title,
                    description = excluded.description,
                    due_date = excluded.due_date,
                    priority = excluded.priority,
                    complete = excluded.complete",
                params![
                    task.id,
                    task.subject_id,
                    task.title,
                    task.description,
                    task.due_date,
                    task.priority.as_int(),
                    task.complete,
                ],
            )?;
            Ok(match task.id {
                Some(id) => id,
                None => conn.last_insert_rowid(),
            })
        })?;

        self.store.notify(&[Collection::Tasks]);
        Ok(id)
    }

    /// Deletes by id. Deleting a missing task is a successful no-op.
    pub fn delete_by_id(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .store
            .with_conn(|conn| conn.execute("DELETE FROM tasks WHERE id = ?1", [id]))?;
        if changed > 0 {
            self.store.notify(&[Collection::Tasks]);
        }
        Ok(())
    }

    pub fn get_by_id(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let task = self.store.with_conn(|conn| {
            conn.query_row(
                &format!("{TASK_SELECT_SQL} WHERE id = ?1"),
                [id],
                parse_task_row,
            )
            .optional()
        })?;
        Ok(task)
    }

    /// Every task owned by one subject, soonest due first. Splitting into
    /// pending and completed is the caller's concern.
    pub fn observe_for_subject(&self, subject_id: SubjectId) -> LiveQuery<Vec<Task>> {
        self.store.live(&[Collection::Tasks], move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{TASK_SELECT_SQL} WHERE subject_id = ?1 {TASK_ORDER_SQL}"
            ))?;
            let rows = stmt.query_map([subject_id], parse_task_row)?;
            rows.collect()
        })
    }

    /// All incomplete tasks across subjects, soonest due first.
    pub fn observe_all_pending(&self) -> LiveQuery<Vec<Task>> {
        self.store.live(&[Collection::Tasks], |conn| {
            let mut stmt = conn.prepare(&format!(
                "{TASK_SELECT_SQL} WHERE complete = 0 {TASK_ORDER_SQL}"
            ))?;
            let rows = stmt.query_map([], parse_task_row)?;
            rows.collect()
        })
    }
}

fn parse_task_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority_int: i64 = row.get("priority")?;
    let priority = Priority::from_int(priority_int).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Integer,
            format!("invalid priority value `{priority_int}` in tasks.priority").into(),
        )
    })?;

    Ok(Task {
        id: Some(row.get("id")?),
        subject_id: row.get("subject_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        due_date: row.get("due_date")?,
        priority,
        complete: row.get("complete")?,
    })
}
