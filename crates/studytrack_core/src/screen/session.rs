//! Session screen: record timer results against a chosen subject.
//!
//! The foreground timer itself lives outside core; it reports through
//! `SessionCommand::SaveSession` carrying the elapsed duration.

use super::{now_epoch_ms, Notice, Notices};
use crate::model::{Session, Subject, SubjectId, MIN_SESSION_SECONDS};
use crate::reactive::{Derived, LocalSlice};
use crate::repo::{SessionRepository, SubjectRepository};

/// Locally held selection state for the session screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionForm {
    pub subject_id: Option<SubjectId>,
    pub subject_name: Option<String>,
    /// Session selected for deletion, if any.
    pub picked_session: Option<Session>,
}

/// Combined session screen snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionScreenState {
    pub subjects: Vec<Subject>,
    pub sessions: Vec<Session>,
    pub form: SessionForm,
}

/// Discrete session screen commands.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    SubjectPicked { id: SubjectId, name: String },
    /// Timer finished; persist the elapsed time.
    SaveSession { elapsed_seconds: i64 },
    PickSession(Session),
    DeleteSession,
    /// Pre-start check: warn when no subject is selected yet.
    EnsureSubjectSelected,
}

/// Session screen reducer plus its derived state handle.
pub struct SessionScreen {
    local: LocalSlice<SessionForm>,
    sessions: SessionRepository,
    notices: Notices,
    state: Derived<SessionScreenState>,
}

impl SessionScreen {
    pub fn new(subjects: SubjectRepository, sessions: SessionRepository) -> Self {
        let local = LocalSlice::new(SessionForm::default());

        let state = Derived::new(
            (local.clone(), subjects.observe_all(), sessions.observe_all()),
            |(form, subject_list, session_list)| SessionScreenState {
                subjects: subject_list,
                sessions: session_list,
                form,
            },
        );

        Self {
            local,
            sessions,
            notices: Notices::default(),
            state,
        }
    }

    pub fn state(&self) -> &Derived<SessionScreenState> {
        &self.state
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn handle(&self, command: SessionCommand) {
        match command {
            SessionCommand::SubjectPicked { id, name } => {
                self.local.update(|form| {
                    form.subject_id = Some(id);
                    form.subject_name = Some(name);
                });
            }
            SessionCommand::SaveSession { elapsed_seconds } => self.save_session(elapsed_seconds),
            SessionCommand::PickSession(session) => {
                self.local.update(|form| form.picked_session = Some(session));
            }
            SessionCommand::DeleteSession => self.delete_picked_session(),
            SessionCommand::EnsureSubjectSelected => {
                if self.local.get().subject_id.is_none() {
                    self.notices.push(Notice::error(
                        "Select a related subject before starting the session",
                    ));
                }
            }
        }
    }

    fn save_session(&self, elapsed_seconds: i64) {
        if elapsed_seconds < MIN_SESSION_SECONDS {
            self.notices.push(Notice::error(format!(
                "A session must run for at least {MIN_SESSION_SECONDS} seconds"
            )));
            return;
        }

        // Saving without a resolved subject is always blocked; there is no
        // sentinel-id fallback.
        let subject_id = match self.local.get().subject_id {
            Some(id) => id,
            None => {
                self.notices
                    .push(Notice::error("Select a related subject before saving the session"));
                return;
            }
        };

        let session = Session {
            id: None,
            subject_id,
            timestamp: now_epoch_ms(),
            duration_seconds: elapsed_seconds,
        };
        match self.sessions.insert(&session) {
            Ok(_) => self.notices.push(Notice::info("Session saved successfully")),
            Err(err) => self
                .notices
                .push(Notice::error(format!("Couldn't save session: {err}"))),
        }
    }

    fn delete_picked_session(&self) {
        let picked = self.local.get().picked_session;
        let id = match picked.and_then(|session| session.id) {
            Some(id) => id,
            None => return,
        };

        match self.sessions.delete_by_id(id) {
            Ok(()) => {
                self.local.update(|form| form.picked_session = None);
                self.notices.push(Notice::info("Session deleted successfully"));
            }
            Err(err) => self
                .notices
                .push(Notice::error(format!("Session couldn't be deleted: {err}"))),
        }
    }
}
