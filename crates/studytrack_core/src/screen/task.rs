//! Task editor screen: create or edit one task.

use super::{now_epoch_ms, Notice, Notices};
use crate::model::{Priority, Subject, SubjectId, Task, TaskId};
use crate::reactive::{Derived, LocalSlice};
use crate::repo::{RepoError, RepoResult, SubjectRepository, TaskRepository};

/// Locally edited task fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    /// `Some` once the task exists in storage; set after first save.
    pub task_id: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub due_date: Option<i64>,
    pub priority: Priority,
    pub complete: bool,
    pub subject_id: Option<SubjectId>,
    pub subject_name: Option<String>,
}

/// Combined task editor snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskEditorState {
    pub subjects: Vec<Subject>,
    pub form: TaskForm,
}

/// Discrete task editor commands.
#[derive(Debug, Clone)]
pub enum TaskCommand {
    TitleChanged(String),
    DescriptionChanged(String),
    DueDateChanged(Option<i64>),
    PriorityChanged(Priority),
    SubjectPicked { id: SubjectId, name: String },
    ToggleComplete,
    SaveTask,
    DeleteTask,
}

/// Task editor reducer plus its derived state handle.
pub struct TaskScreen {
    local: LocalSlice<TaskForm>,
    tasks: TaskRepository,
    notices: Notices,
    state: Derived<TaskEditorState>,
}

impl TaskScreen {
    /// Blank editor for a new task with no preselected subject.
    pub fn new(subjects: SubjectRepository, tasks: TaskRepository) -> Self {
        Self::with_form(subjects, tasks, TaskForm::default())
    }

    /// Editor seeded from a stored task. A missing task id is reported.
    pub fn for_task(
        subjects: SubjectRepository,
        tasks: TaskRepository,
        task_id: TaskId,
    ) -> RepoResult<Self> {
        let stored = tasks.get_by_id(task_id)?.ok_or(RepoError::NotFound {
            entity: "task",
            id: task_id,
        })?;
        let subject_name = subjects
            .get_by_id(stored.subject_id)?
            .map(|subject| subject.name);

        Ok(Self::with_form(
            subjects,
            tasks,
            TaskForm {
                task_id: stored.id,
                title: stored.title,
                description: stored.description,
                due_date: Some(stored.due_date),
                priority: stored.priority,
                complete: stored.complete,
                subject_id: Some(stored.subject_id),
                subject_name,
            },
        ))
    }

    /// Blank editor preselecting one subject. A missing subject is reported.
    pub fn for_subject(
        subjects: SubjectRepository,
        tasks: TaskRepository,
        subject_id: SubjectId,
    ) -> RepoResult<Self> {
        let stored = subjects.get_by_id(subject_id)?.ok_or(RepoError::NotFound {
            entity: "subject",
            id: subject_id,
        })?;

        Ok(Self::with_form(
            subjects,
            tasks,
            TaskForm {
                subject_id: stored.id,
                subject_name: Some(stored.name),
                ..TaskForm::default()
            },
        ))
    }

    fn with_form(subjects: SubjectRepository, tasks: TaskRepository, form: TaskForm) -> Self {
        let local = LocalSlice::new(form);

        let state = Derived::new(
            (local.clone(), subjects.observe_all()),
            |(form, subject_list)| TaskEditorState {
                subjects: subject_list,
                form,
            },
        );

        Self {
            local,
            tasks,
            notices: Notices::default(),
            state,
        }
    }

    pub fn state(&self) -> &Derived<TaskEditorState> {
        &self.state
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn handle(&self, command: TaskCommand) {
        match command {
            TaskCommand::TitleChanged(title) => {
                self.local.update(|form| form.title = title);
            }
            TaskCommand::DescriptionChanged(description) => {
                self.local.update(|form| form.description = description);
            }
            TaskCommand::DueDateChanged(due_date) => {
                self.local.update(|form| form.due_date = due_date);
            }
            TaskCommand::PriorityChanged(priority) => {
                self.local.update(|form| form.priority = priority);
            }
            TaskCommand::SubjectPicked { id, name } => {
                self.local.update(|form| {
                    form.subject_id = Some(id);
                    form.subject_name = Some(name);
                });
            }
            TaskCommand::ToggleComplete => {
                self.local.update(|form| form.complete = !form.complete);
            }
            TaskCommand::SaveTask => self.save_task(),
            TaskCommand::DeleteTask => self.delete_task(),
        }
    }

    fn save_task(&self) {
        let form = self.local.get();

        // Saving without a resolved subject is always blocked.
        let subject_id = match form.subject_id {
            Some(id) => id,
            None => {
                self.notices
                    .push(Notice::error("Select a related subject for the task"));
                return;
            }
        };

        let task = Task {
            id: form.task_id,
            subject_id,
            title: form.title.trim().to_string(),
            description: form.description.clone(),
            due_date: form.due_date.unwrap_or_else(now_epoch_ms),
            priority: form.priority,
            complete: form.complete,
        };
        if let Err(err) = task.validate() {
            self.notices.push(Notice::error(err.to_string()));
            return;
        }

        match self.tasks.upsert(&task) {
            Ok(id) => {
                // Subsequent saves update this row instead of inserting.
                self.local.update(|form| form.task_id = Some(id));
                self.notices.push(Notice::info("Task saved successfully"));
            }
            Err(err) => self
                .notices
                .push(Notice::error(format!("Couldn't save task: {err}"))),
        }
    }

    fn delete_task(&self) {
        let task_id = match self.local.get().task_id {
            Some(id) => id,
            None => {
                self.notices.push(Notice::error("Task couldn't be found"));
                return;
            }
        };

        match self.tasks.delete_by_id(task_id) {
            Ok(()) => {
                self.local.update(|form| form.task_id = None);
                self.notices.push(Notice::info("Task deleted successfully"));
            }
            Err(err) => self
                .notices
                .push(Notice::error(format!("Task couldn't be deleted: {err}"))),
        }
    }
}
