//! Dashboard screen: overall totals, subject creation, recent activity.

use super::{Notice, Notices};
use crate::model::{Session, Subject, Task};
use crate::reactive::{Derived, LocalSlice};
use crate::repo::{SessionRepository, SubjectRepository, TaskRepository};

/// Locally edited, not yet saved dashboard fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardForm {
    pub subject_name: String,
    pub goal_hours_text: String,
    /// Palette chosen for the next saved subject; picking is UI policy.
    pub colors: Vec<i64>,
    /// Session selected for deletion, if any.
    pub picked_session: Option<Session>,
}

/// Combined dashboard snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub total_subject_count: i64,
    pub total_goal_hours: f64,
    pub total_studied_seconds: i64,
    pub subjects: Vec<Subject>,
    pub form: DashboardForm,
}

impl DashboardState {
    pub fn total_studied_hours(&self) -> f64 {
        self.total_studied_seconds as f64 / 3600.0
    }
}

/// Discrete dashboard commands.
#[derive(Debug, Clone)]
pub enum DashboardCommand {
    SubjectNameChanged(String),
    GoalHoursChanged(String),
    ColorsChanged(Vec<i64>),
    PickSession(Session),
    SaveSubject,
    DeleteSession,
    ToggleTaskComplete(Task),
}

/// Dashboard reducer plus its derived state handles.
pub struct DashboardScreen {
    local: LocalSlice<DashboardForm>,
    subjects: SubjectRepository,
    tasks: TaskRepository,
    sessions: SessionRepository,
    notices: Notices,
    state: Derived<DashboardState>,
    pending_tasks: Derived<Vec<Task>>,
    recent_sessions: Derived<Vec<Session>>,
}

impl DashboardScreen {
    pub fn new(
        subjects: SubjectRepository,
        tasks: TaskRepository,
        sessions: SessionRepository,
    ) -> Self {
        let local = LocalSlice::new(DashboardForm::default());

        let state = Derived::new(
            (
                local.clone(),
                subjects.observe_count(),
                subjects.observe_goal_hours_sum(),
                subjects.observe_all(),
                sessions.observe_total_duration(),
            ),
            |(form, count, goal_hours, subject_list, studied_seconds)| DashboardState {
                total_subject_count: count,
                total_goal_hours: goal_hours,
                total_studied_seconds: studied_seconds,
                subjects: subject_list,
                form,
            },
        );
        let pending_tasks = Derived::new((tasks.observe_all_pending(),), |(tasks,)| tasks);
        let recent_sessions = Derived::new((sessions.observe_recent(5),), |(sessions,)| sessions);

        Self {
            local,
            subjects,
            tasks,
            sessions,
            notices: Notices::default(),
            state,
            pending_tasks,
            recent_sessions,
        }
    }

    pub fn state(&self) -> &Derived<DashboardState> {
        &self.state
    }

    pub fn pending_tasks(&self) -> &Derived<Vec<Task>> {
        &self.pending_tasks
    }

    pub fn recent_sessions(&self) -> &Derived<Vec<Session>> {
        &self.recent_sessions
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn handle(&self, command: DashboardCommand) {
        match command {
            DashboardCommand::SubjectNameChanged(name) => {
                self.local.update(|form| form.subject_name = name);
            }
            DashboardCommand::GoalHoursChanged(text) => {
                self.local.update(|form| form.goal_hours_text = text);
            }
            DashboardCommand::ColorsChanged(colors) => {
                self.local.update(|form| form.colors = colors);
            }
            DashboardCommand::PickSession(session) => {
                self.local.update(|form| form.picked_session = Some(session));
            }
            DashboardCommand::SaveSubject => self.save_subject(),
            DashboardCommand::DeleteSession => self.delete_picked_session(),
            DashboardCommand::ToggleTaskComplete(task) => self.toggle_task_complete(task),
        }
    }

    fn save_subject(&self) {
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
            id: None,
            name: form.subject_name.trim().to_string(),
            goal_hours,
            colors: form.colors.clone(),
        };
        if let Err(err) = subject.validate() {
            self.notices.push(Notice::error(err.to_string()));
            return;
        }

        match self.subjects.upsert(&subject) {
            Ok(_) => {
                self.local.update(|form| {
                    form.subject_name.clear();
                    form.goal_hours_text.clear();
                });
                self.notices.push(Notice::info("Subject saved successfully"));
            }
            Err(err) => self
                .notices
                .push(Notice::error(format!("Couldn't save subject: {err}"))),
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

pub(crate) fn parse_goal_hours(text: &str) -> Option<f64> {
    match text.trim().parse::<f64>() {
        Ok(hours) if hours.is_finite() && hours > 0.0 => Some(hours),
        _ => None,
    }
}
