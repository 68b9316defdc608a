//! Screen-level command reducers and derived state.
//!
//! # Responsibility
//! - Apply discrete UI commands to screen-local state slices.
//! - Validate save/delete commands locally before any repository call and
//!   translate outcomes into user-facing notices.
//! - Wire repository live queries and the local slice into one `Derived`
//!   snapshot per screen.
//!
//! # Invariants
//! - Every command variant is handled exhaustively.
//! - Field edits update the local slice optimistically; persisted-entity
//!   state changes only on confirmed repository success.
//! - Repository failures never escape a screen as an error; they surface
//!   as notices.

use crate::reactive::lock;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod dashboard;
pub mod session;
pub mod subject;
pub mod task;

pub use dashboard::{DashboardCommand, DashboardForm, DashboardScreen, DashboardState};
pub use session::{SessionCommand, SessionForm, SessionScreen, SessionScreenState};
pub use subject::{SubjectCommand, SubjectDetailState, SubjectForm, SubjectScreen};
pub use task::{TaskCommand, TaskEditorState, TaskForm, TaskScreen};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A transient user-facing message (the snackbar analogue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// FIFO queue of pending notices shared between a screen and its renderer.
#[derive(Clone, Default)]
pub struct Notices {
    inner: Arc<Mutex<VecDeque<Notice>>>,
}

impl Notices {
    pub fn push(&self, notice: Notice) {
        lock(&self.inner).push_back(notice);
    }

    /// Removes and returns all queued notices, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        lock(&self.inner).drain(..).collect()
    }
}

/// Current wall-clock time as epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
