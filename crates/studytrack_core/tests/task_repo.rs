use studytrack_core::db::open_db_in_memory;
use studytrack_core::model::ValidationError;
use studytrack_core::repo::RepoError;
use studytrack_core::{Priority, Store, Subject, SubjectRepository, Task, TaskRepository};

fn store() -> Store {
    Store::new(open_db_in_memory().unwrap())
}

fn seed_subject(store: &Store) -> i64 {
    SubjectRepository::new(store.clone())
        .upsert(&Subject {
            id: None,
            name: "Math".to_string(),
            goal_hours: 20.0,
            colors: vec![],
        })
        .unwrap()
}

fn task(subject_id: i64, title: &str, due_date: i64) -> Task {
    Task {
        id: None,
        subject_id,
        title: title.to_string(),
        description: String::new(),
        due_date,
        priority: Priority::Low,
        complete: false,
    }
}

#[test]
fn upsert_inserts_then_updates_the_same_row() {
    let store = store();
    let subject_id = seed_subject(&store);
    let tasks = TaskRepository::new(store);

    let id = tasks.upsert(&task(subject_id, "homework", 100)).unwrap();

    let mut stored = tasks.get_by_id(id).unwrap().unwrap();
    assert_eq!(stored.title, "homework");

    stored.title = "homework (revised)".to_string();
    stored.priority = Priority::High;
    let second_id = tasks.upsert(&stored).unwrap();
    assert_eq!(second_id, id);

    let updated = tasks.get_by_id(id).unwrap().unwrap();
    assert_eq!(updated.title, "homework (revised)");
    assert_eq!(updated.priority, Priority::High);
    assert_eq!(tasks.observe_all_pending().get().unwrap().len(), 1);
}

#[test]
fn upsert_rejects_invalid_titles() {
    let store = store();
    let subject_id = seed_subject(&store);
    let tasks = TaskRepository::new(store);

    let err = tasks.upsert(&task(subject_id, "   ", 100)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyTaskTitle)
    ));
    assert!(tasks.observe_all_pending().get().unwrap().is_empty());
}

#[test]
fn get_by_id_returns_none_for_missing_task() {
    let store = store();
    let tasks = TaskRepository::new(store);

    assert!(tasks.get_by_id(777).unwrap().is_none());
}

#[test]
fn delete_is_idempotent() {
    let store = store();
    let subject_id = seed_subject(&store);
    let tasks = TaskRepository::new(store);

    let id = tasks.upsert(&task(subject_id, "essay", 100)).unwrap();
    tasks.delete_by_id(id).unwrap();
    tasks.delete_by_id(id).unwrap();

    assert!(tasks.get_by_id(id).unwrap().is_none());
}

#[test]
fn pending_query_excludes_completed_tasks() {
    let store = store();
    let subject_id = seed_subject(&store);
    let tasks = TaskRepository::new(store);

    tasks.upsert(&task(subject_id, "open", 100)).unwrap();
    let done = Task {
        complete: true,
        ..task(subject_id, "done", 50)
    };
    tasks.upsert(&done).unwrap();

    let pending = tasks.observe_all_pending().get().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].title, "open");

    let all_for_subject = tasks.observe_for_subject(subject_id).get().unwrap();
    assert_eq!(all_for_subject.len(), 2);
}

#[test]
fn tasks_are_ordered_soonest_due_first() {
    let store = store();
    let subject_id = seed_subject(&store);
    let tasks = TaskRepository::new(store);

    tasks.upsert(&task(subject_id, "later", 300)).unwrap();
    tasks.upsert(&task(subject_id, "soon", 100)).unwrap();
    tasks.upsert(&task(subject_id, "middle", 200)).unwrap();

    let titles: Vec<String> = tasks
        .observe_for_subject(subject_id)
        .get()
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["soon", "middle", "later"]);
}
