//! Subject domain model.

use super::{ValidationError, SUBJECT_NAME_MAX_CHARS};
use serde::{Deserialize, Serialize};

/// Stable identifier for a persisted subject (SQLite rowid).
pub type SubjectId = i64;

/// A study subject with a weekly goal and a card color palette.
///
/// Subjects are the parent of tasks and sessions via their id. Deleting a
/// subject goes through `SubjectRepository::delete_cascade`, never through a
/// bare row delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// `None` until first persisted.
    pub id: Option<SubjectId>,
    pub name: String,
    /// Target study hours for this subject.
    pub goal_hours: f64,
    /// Ordered ARGB color values for the subject card gradient.
    pub colors: Vec<i64>,
}

impl Subject {
    pub fn new(name: impl Into<String>, goal_hours: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            goal_hours,
            colors: Vec::new(),
        }
    }

    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptySubjectName);
        }
        let chars = name.chars().count();
        if chars > SUBJECT_NAME_MAX_CHARS {
            return Err(ValidationError::SubjectNameTooLong { chars });
        }
        if !self.goal_hours.is_finite() || self.goal_hours <= 0.0 {
            return Err(ValidationError::GoalHoursNotPositive);
        }
        Ok(())
    }
}
