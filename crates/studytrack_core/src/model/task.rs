//! Task domain model.

use super::{SubjectId, ValidationError, TASK_TITLE_MAX_CHARS};
use serde::{Deserialize, Serialize};

/// Stable identifier for a persisted task (SQLite rowid).
pub type TaskId = i64;

/// Task urgency, persisted as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_int(self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Low
    }
}

/// A dated to-do item owned by one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// `None` until first persisted.
    pub id: Option<TaskId>,
    pub subject_id: SubjectId,
    pub title: String,
    pub description: String,
    /// Due date as epoch milliseconds.
    pub due_date: i64,
    pub priority: Priority,
    pub complete: bool,
}

impl Task {
    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject_id <= 0 {
            return Err(ValidationError::MissingSubject);
        }
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTaskTitle);
        }
        let chars = title.chars().count();
        if chars > TASK_TITLE_MAX_CHARS {
            return Err(ValidationError::TaskTitleTooLong { chars });
        }
        Ok(())
    }
}
