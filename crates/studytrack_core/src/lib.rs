//! Core domain logic for StudyTrack.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod reactive;
pub mod repo;
pub mod screen;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    Priority, Session, SessionId, Subject, SubjectId, Task, TaskId, ValidationError,
    MIN_SESSION_SECONDS,
};
pub use reactive::{Consumer, Derived, LocalSlice, Subscription, Watchable};
pub use repo::{RepoError, RepoResult, SessionRepository, SubjectRepository, TaskRepository};
pub use screen::{Notice, NoticeKind, Notices};
pub use store::{Collection, LiveQuery, Store};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
