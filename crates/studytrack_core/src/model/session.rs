//! Study session domain model.

use super::{SubjectId, ValidationError};
use serde::{Deserialize, Serialize};

/// Stable identifier for a persisted session (SQLite rowid).
pub type SessionId = i64;

/// Minimum accepted session length. Shorter sessions are rejected before
/// persistence and never create a row.
pub const MIN_SESSION_SECONDS: i64 = 36;

/// One timed study session against a subject.
///
/// Sessions are immutable once created: they are inserted and deleted, never
/// updated in place. Total studied time per subject is always derived from
/// the stored rows, never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// `None` until first persisted.
    pub id: Option<SessionId>,
    pub subject_id: SubjectId,
    /// Start of the session as epoch milliseconds.
    pub timestamp: i64,
    pub duration_seconds: i64,
}

impl Session {
    /// Checks field-level invariants before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subject_id <= 0 {
            return Err(ValidationError::MissingSubject);
        }
        if self.duration_seconds < MIN_SESSION_SECONDS {
            return Err(ValidationError::SessionTooShort {
                seconds: self.duration_seconds,
            });
        }
        Ok(())
    }
}
