use studytrack_core::db::open_db_in_memory;
use studytrack_core::model::{ValidationError, MIN_SESSION_SECONDS};
use studytrack_core::repo::RepoError;
use studytrack_core::{Session, SessionRepository, Store, Subject, SubjectRepository};

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

fn session(subject_id: i64, timestamp: i64, duration_seconds: i64) -> Session {
    Session {
        id: None,
        subject_id,
        timestamp,
        duration_seconds,
    }
}

#[test]
fn session_below_minimum_is_rejected_without_touching_storage() {
    let store = store();
    let subject_id = seed_subject(&store);
    let sessions = SessionRepository::new(store);

    let err = sessions
        .insert(&session(subject_id, 1_000, MIN_SESSION_SECONDS - 1))
        .unwrap_err();
    match err {
        RepoError::Validation(ValidationError::SessionTooShort { seconds }) => {
            assert_eq!(seconds, MIN_SESSION_SECONDS - 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(sessions.observe_all().get().unwrap().is_empty());
}

#[test]
fn session_at_minimum_is_accepted() {
    let store = store();
    let subject_id = seed_subject(&store);
    let sessions = SessionRepository::new(store);

    let id = sessions
        .insert(&session(subject_id, 1_000, MIN_SESSION_SECONDS))
        .unwrap();
    assert!(id > 0);

    let stored = sessions.observe_all().get().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].duration_seconds, MIN_SESSION_SECONDS);
}

#[test]
fn total_duration_tracks_inserts_and_deletes() {
    let store = store();
    let subject_id = seed_subject(&store);
    let sessions = SessionRepository::new(store);
    let total = sessions.observe_total_duration_for_subject(subject_id);

    assert_eq!(total.get().unwrap(), 0);

    let first = sessions.insert(&session(subject_id, 1_000, 3600)).unwrap();
    sessions.insert(&session(subject_id, 2_000, 1800)).unwrap();
    assert_eq!(total.get().unwrap(), 5400);

    sessions.delete_by_id(first).unwrap();
    assert_eq!(total.get().unwrap(), 1800);
}

#[test]
fn deleting_a_missing_session_is_a_successful_noop() {
    let store = store();
    let sessions = SessionRepository::new(store);

    sessions.delete_by_id(999).unwrap();
    sessions.delete_by_id(999).unwrap();
}

#[test]
fn sessions_are_ordered_newest_first() {
    let store = store();
    let subject_id = seed_subject(&store);
    let sessions = SessionRepository::new(store);

    sessions.insert(&session(subject_id, 100, 60)).unwrap();
    sessions.insert(&session(subject_id, 300, 60)).unwrap();
    sessions.insert(&session(subject_id, 200, 60)).unwrap();

    let timestamps: Vec<i64> = sessions
        .observe_all()
        .get()
        .unwrap()
        .iter()
        .map(|s| s.timestamp)
        .collect();
    assert_eq!(timestamps, vec![300, 200, 100]);
}

#[test]
fn recent_queries_honor_their_limit() {
    let store = store();
    let subject_id = seed_subject(&store);
    let sessions = SessionRepository::new(store);

    for timestamp in 1..=8 {
        sessions.insert(&session(subject_id, timestamp, 60)).unwrap();
    }

    let recent = sessions.observe_recent(5).get().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].timestamp, 8);

    let for_subject = sessions.observe_for_subject(subject_id, 3).get().unwrap();
    assert_eq!(for_subject.len(), 3);
    assert_eq!(for_subject[0].timestamp, 8);
}

#[test]
fn per_subject_queries_exclude_other_subjects() {
    let store = store();
    let math = seed_subject(&store);
    let physics = SubjectRepository::new(store.clone())
        .upsert(&Subject {
            id: None,
            name: "Physics".to_string(),
            goal_hours: 5.0,
            colors: vec![],
        })
        .unwrap();
    let sessions = SessionRepository::new(store);

    sessions.insert(&session(math, 100, 600)).unwrap();
    sessions.insert(&session(physics, 200, 900)).unwrap();

    let math_sessions = sessions.observe_for_subject(math, 10).get().unwrap();
    assert_eq!(math_sessions.len(), 1);
    assert_eq!(math_sessions[0].subject_id, math);

    assert_eq!(
        sessions
            .observe_total_duration_for_subject(physics)
            .get()
            .unwrap(),
        900
    );
    assert_eq!(sessions.observe_total_duration().get().unwrap(), 1500);
}
