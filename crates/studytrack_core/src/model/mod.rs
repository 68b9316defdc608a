//! Domain models for subjects, tasks and study sessions.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own field-level validation rules shared by repositories and screens.
//!
//! # Invariants
//! - Identity is a SQLite rowid assigned on first persist; `id == None`
//!   means the value has never been stored.
//! - Validation must pass before any model reaches a repository write.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod session;
pub mod subject;
pub mod task;

pub use session::{Session, SessionId, MIN_SESSION_SECONDS};
pub use subject::{Subject, SubjectId};
pub use task::{Priority, Task, TaskId};

/// Maximum accepted subject name length in characters.
pub const SUBJECT_NAME_MAX_CHARS: usize = 100;

/// Maximum accepted task title length in characters.
pub const TASK_TITLE_MAX_CHARS: usize = 200;

/// Field-level validation failure. Handled locally, never reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptySubjectName,
    SubjectNameTooLong { chars: usize },
    GoalHoursNotPositive,
    EmptyTaskTitle,
    TaskTitleTooLong { chars: usize },
    MissingSubject,
    SessionTooShort { seconds: i64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySubjectName => write!(f, "subject name cannot be empty"),
            Self::SubjectNameTooLong { chars } => write!(
                f,
                "subject name is {chars} characters, maximum is {SUBJECT_NAME_MAX_CHARS}"
            ),
            Self::GoalHoursNotPositive => {
                write!(f, "goal study hours must be a positive number")
            }
            Self::EmptyTaskTitle => write!(f, "task title cannot be empty"),
            Self::TaskTitleTooLong { chars } => write!(
                f,
                "task title is {chars} characters, maximum is {TASK_TITLE_MAX_CHARS}"
            ),
            Self::MissingSubject => write!(f, "a related subject must be selected"),
            Self::SessionTooShort { seconds } => write!(
                f,
                "session lasted {seconds} seconds, minimum is {MIN_SESSION_SECONDS}"
            ),
        }
    }
}

impl Error for ValidationError {}
