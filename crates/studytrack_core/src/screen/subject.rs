//! Subject detail screen: one subject's tasks, sessions, and progress.

use super::dashboard::parse_goal_hours;
use super::{Notice, Notices};
use crate::model::{Session, Subject, SubjectId, Task};
use crate::reactive::{Derived, LocalSlice};
use crate::repo::{RepoResult, SessionRepository, SubjectRepository, TaskRepository};

const RECENT_SESSION_LIMIT: u32 = 10;

/// Locally edited subject fields plus the session picked for deletion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectForm {
    pub name: String,
    pub goal_hours_text: String,
    pub colors: Vec<i64>,
    pub picked_session: Option<Session>,
}

/// Combined subject detail snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectDetailState {
    pub upcoming_tasks: Vec<Task>,
    pub completed_tasks: Vec<Task>,
    pub recent_sessions: Vec<Session>,
    pub studied_seconds: i64,
    pub form: SubjectForm,
}

impl SubjectDetailState {
    /// Fraction of the goal studied so far, clamped to `0.0..=1.0`.
    /// Derived on read; never stored.
    pub fn progress(&self) -> f64 {
        let goal_hours = parse_goal_hours(&self.form.goal_hours_text).unwrap_or(1.0);
        let studied_hours = self.studied_seconds as f64 / 3600.0;
        (studied_hours / goal_hours).clamp(0.0, 1.0)
    }
}

/// Discrete subject detail commands.
#[derive(Debug, Clone)]
pub enum SubjectCommand {
    NameChanged(String),
    GoalHoursChanged(String),
    ColorsChanged(Vec<i64>),
    UpdateSubject,
    /// Cascading delete: the subject and every task/session referencing it.
    DeleteSubject,
    PickSession(Session),
    DeleteSession,
    ToggleTaskComplete(Task),
}

/// Subject detail reducer plus its derived state handle.
pub struct SubjectScreen {
    subject_id: SubjectId,
    local: LocalSlice<SubjectForm>,
    subjects: SubjectRepository,
    tasks: TaskRepository,
    sessions: SessionRepository,
    notices: Notices,
    state: Derived<SubjectDetailState>,
}

impl SubjectScreen {
    /// Builds the screen for one subject, seeding the form from the stored
    /// row. A missing subject is reported, not silently tolerated.
    pub fn new(
        subject_id: SubjectId,
        subjects: SubjectRepository,
        tasks: TaskRepository,
        sessions: SessionRepository,
    ) -> RepoResult<Self> {
        let stored = subjects
            .get_by_id(subject_id)?
            .ok_or(crate::repo::RepoError::NotFound {
                entity: "subject",
                id: subject_id,
            })?;

        let local = LocalSlice::new(SubjectForm {
            name: stored.name,
            goal_hours_text: format_goal_hours(stored.goal_hours),
            colors: stored.colors,
            picked_session: None,
        });

        let state = Derived::new(
            (
                local.clone(),
                tasks.observe_for_subject(subject_id),
                sessions.observe_for_subject(subject_id, RECENT_SESSION_LIMIT),
                sessions.observe_total_duration_for_subject(subject_id),
            ),
            |(form, subject_tasks, recent_sessions, studied_seconds)| {
                let (completed_tasks, upcoming_tasks): (Vec<Task>, Vec<Task>) =
                    subject_tasks.into_iter().partition(|task| task.complete);
                SubjectDetailState {
                    upcoming_tasks,
                    completed_tasks,
                    recent_sessions,
                    studied_seconds,
                    form,
                }
            },
        );

        Ok(Self {
            subject_id,
            local,
            subjects,
            tasks,
            sessions,
            notices: Notices::default(),
            state,
        })
    }

    pub fn state(&self) -> &Derived<SubjectDetailState> {
        &self.state
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn handle(&self, command: SubjectCommand) {
        match command {
            SubjectCommand::NameChanged(name) => {
                self.local.update(|form| form.name = name);
            }
            SubjectCommand::GoalHoursChanged(text) => {
                self.local.update(|form| form.goal_hours_text = text);
            }
            SubjectCommand::ColorsChanged(colors) => {
                self.local.update(|form| form.colors = colors);
            }
            SubjectCommand::UpdateSubject => self.update_subject(),
            SubjectCommand::DeleteSubject => self.delete_subject(),
            SubjectCommand::PickSession(session) => {
                self.local.update(|form| form.picked_session = Some(session));
            }
            SubjectCommand::DeleteSession => self.delete_picked_session(),
            SubjectCommand::ToggleTaskComplete(task) => self.toggle_task_complete(task),
        }
    }

    fn update_subject(&self) {
        let form = self.local.get();
        let goal_hours = match parse_goal_hours(&form.goal_hours_text) {
            Some(hours) => hours,
            None => {
                self.notices
                    .push(Notice::error("Goal study hours must be a positive number"));
                return;
            }
        };

        let subject = Subject {
            id: Some(self.subject_id),
            name: form.name.trim().to_string(),
            goal_hours,
            colors: form.colors.clone(),
        };
        if let Err(err) = subject.validate() {
            self.notices.push(Notice::error(err.to_string()));
            return;
        }

        match self.subjects.upsert(&subject) {
            Ok(_) => self.notices.push(Notice::info("Subject updated successfully")),
            Err(err) => self
                .notices
                .push(Notice::error(format!("Couldn't update subject: {err}"))),
        }
    }

    fn delete_subject(&self) {
        match self.subjects.delete_cascade(self.subject_id) {
            Ok(()) => self.notices.push(Notice::info("Subject deleted successfully")),
            Err(err) => self
                .notices
                .push(Notice::error(format!("Couldn't delete subject: {err}"))),
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

    fn toggle_task_complete(&self, task: Task) {
        let toggled = Task {
            complete: !task.complete,
            ..task
        };
        match self.tasks.upsert(&toggled) {
            Ok(_) => {
                let message = if toggled.complete {
                    "Task marked as completed"
                } else {
                    "Task moved back to upcoming"
                };
                self.notices.push(Notice::info(message));
            }
            Err(err) => self
                .notices
                .push(Notice::error(format!("Couldn't save task: {err}"))),
        }
    }
}

fn format_goal_hours(goal_hours: f64) -> String {
    // Keep "10" instead of "10.0" for round goals; users edit this text.
    if goal_hours.fract() == 0.0 {
        format!("{}", goal_hours as i64)
    } else {
        format!("{goal_hours}")
    }
}
