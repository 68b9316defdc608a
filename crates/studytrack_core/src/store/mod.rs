//! Shared storage handle and live queries.
//!
//! # Responsibility
//! - Serialize all SQLite access behind one connection lock.
//! - Re-run registered live queries after every write that touches their
//!   collection and push fresh results to watchers.
//!
//! # Invariants
//! - A committed write is visible to the next emission of every live query
//!   on the written collection (read-your-writes).
//! - Invalidation is conservative: any write to a collection refreshes all
//!   watchers on it. Soundness over precision.
//! - Refresh queries run under the connection lock; delivery happens after
//!   the lock is released, so an emission handler may itself issue writes.
//! - Refresh passes are serialized through a queue: the last value a
//!   watcher receives always reflects the latest committed write, even
//!   with concurrent writers.

use crate::db::{DbError, DbResult};
use crate::reactive::{lock, Subscription, WatchSink, Watchable};
use log::error;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Persisted collection identifier used for watcher routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Subjects,
    Tasks,
    Sessions,
}

/// Re-runs one watcher's query; returns the delivery step, or `None` when
/// the query failed and the emission is skipped.
type Refresh = Box<dyn Fn(&Connection) -> Option<Box<dyn FnOnce() + Send>> + Send>;

struct Watcher {
    collections: &'static [Collection],
    refresh: Refresh,
}

/// Collections waiting for a refresh pass, plus whether one is in flight.
struct NotifyState {
    draining: bool,
    queue: Vec<Collection>,
}

struct StoreInner {
    conn: Mutex<Connection>,
    watchers: Mutex<HashMap<u64, Watcher>>,
    notify_state: Mutex<NotifyState>,
    next_watcher: AtomicU64,
}

/// Cloneable handle over one SQLite connection plus the watcher registry.
///
/// All repositories share a clone; writes go through a repository, which
/// calls `notify` with the touched collections after the write commits.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                watchers: Mutex::new(HashMap::new()),
                notify_state: Mutex::new(NotifyState {
                    draining: false,
                    queue: Vec::new(),
                }),
                next_watcher: AtomicU64::new(0),
            }),
        }
    }

    /// Runs `f` with the connection lock held.
    pub fn with_conn<R>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<R>) -> DbResult<R> {
        let conn = lock(&self.inner.conn);
        f(&conn).map_err(DbError::from)
    }

    /// Refreshes every watcher whose collection set intersects `touched`.
    ///
    /// Passes are serialized: one thread at a time drains the pending
    /// queue, so a refresh computed for an earlier write is always
    /// delivered before the refresh for a later one. A call arriving while
    /// a pass is in flight (including one made from inside an emission
    /// handler) enqueues its collections and returns; the draining thread
    /// picks them up in its next iteration.
    ///
    /// Queries run under the connection lock taken after the triggering
    /// write released it, so they observe the write. Deliveries run after
    /// the lock is dropped.
    pub(crate) fn notify(&self, touched: &[Collection]) {
        {
            let mut pending = lock(&self.inner.notify_state);
            for collection in touched {
                if !pending.queue.contains(collection) {
                    pending.queue.push(*collection);
                }
            }
            if pending.draining {
                return;
            }
            pending.draining = true;
        }

        loop {
            let batch = {
                let mut pending = lock(&self.inner.notify_state);
                if pending.queue.is_empty() {
                    pending.draining = false;
                    return;
                }
                std::mem::take(&mut pending.queue)
            };

            let mut deliveries: Vec<Box<dyn FnOnce() + Send>> = Vec::new();
            {
                let watchers = lock(&self.inner.watchers);
                let conn = lock(&self.inner.conn);
                for watcher in watchers.values() {
                    if watcher.collections.iter().any(|c| batch.contains(c)) {
                        if let Some(deliver) = (watcher.refresh)(&conn) {
                            deliveries.push(deliver);
                        }
                    }
                }
            }
            for deliver in deliveries {
                deliver();
            }
        }
    }

    /// Builds a live query over the given collections.
    pub fn live<T>(
        &self,
        collections: &'static [Collection],
        query: impl Fn(&Connection) -> rusqlite::Result<T> + Send + Sync + 'static,
    ) -> LiveQuery<T> {
        LiveQuery {
            store: self.clone(),
            collections,
            query: Arc::new(query),
        }
    }

    /// Number of currently registered watchers. Drops back to zero once all
    /// live subscriptions are cancelled or drained.
    pub fn watcher_count(&self) -> usize {
        lock(&self.inner.watchers).len()
    }

    fn add_watcher(&self, collections: &'static [Collection], refresh: Refresh) -> Subscription {
        let id = self.inner.next_watcher.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.watchers).insert(
            id,
            Watcher {
                collections,
                refresh,
            },
        );

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.watchers).remove(&id);
            }
        })
    }
}

/// A subscribable query whose result is re-delivered on every relevant
/// write. An empty result set is a successful value; only I/O errors fail.
pub struct LiveQuery<T> {
    store: Store,
    collections: &'static [Collection],
    query: Arc<dyn Fn(&Connection) -> rusqlite::Result<T> + Send + Sync>,
}

impl<T> Clone for LiveQuery<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            collections: self.collections,
            query: Arc::clone(&self.query),
        }
    }
}

impl<T: Clone + Send + 'static> LiveQuery<T> {
    /// One-shot snapshot of the current result.
    pub fn get(&self) -> DbResult<T> {
        let query = Arc::clone(&self.query);
        self.store.with_conn(move |conn| query(conn))
    }
}

impl<T: Clone + Send + 'static> Watchable<T> for LiveQuery<T> {
    fn watch(&self, sink: WatchSink<T>) -> Subscription {
        let query = Arc::clone(&self.query);
        let refresh_sink = Arc::clone(&sink);
        let refresh: Refresh = Box::new(move |conn| match query(conn) {
            Ok(value) => {
                let sink = Arc::clone(&refresh_sink);
                Some(Box::new(move || sink(value)))
            }
            Err(err) => {
                error!("event=live_query module=store status=error error={err}");
                None
            }
        });

        let sub = self.store.add_watcher(self.collections, refresh);

        // Initial emission: current contents, delivered as soon as the
        // subscriber attaches.
        match self.get() {
            Ok(value) => sink(value),
            Err(err) => {
                error!("event=live_query module=store status=error phase=initial error={err}")
            }
        }

        sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db_in_memory;

    fn store() -> Store {
        Store::new(open_db_in_memory().expect("in-memory db"))
    }

    #[test]
    fn live_query_emits_current_value_on_watch() {
        let store = store();
        let query = store.live(&[Collection::Subjects], |conn| {
            conn.query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get::<_, i64>(0))
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let _sub = query.watch(Arc::new(move |v| sink_seen.lock().unwrap().push(v)));

        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[test]
    fn write_then_notify_reaches_watchers() {
        let store = store();
        let query = store.live(&[Collection::Subjects], |conn| {
            conn.query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get::<_, i64>(0))
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let _sub = query.watch(Arc::new(move |v| sink_seen.lock().unwrap().push(v)));

        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO subjects (name, goal_hours) VALUES ('Math', 5.0)",
                    [],
                )
            })
            .expect("insert");
        store.notify(&[Collection::Subjects]);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn concurrent_writers_leave_watchers_on_the_final_count() {
        let store = store();
        let query = store.live(&[Collection::Subjects], |conn| {
            conn.query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get::<_, i64>(0))
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let _sub = query.watch(Arc::new(move |v| sink_seen.lock().unwrap().push(v)));

        let writers: Vec<_> = (0..2)
            .map(|writer| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..5 {
                        store
                            .with_conn(|conn| {
                                conn.execute(
                                    "INSERT INTO subjects (name, goal_hours) VALUES (?1, 5.0)",
                                    [format!("subject-{writer}-{i}")],
                                )
                            })
                            .expect("insert");
                        store.notify(&[Collection::Subjects]);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread");
        }

        // Whatever interleaving happened, the final delivery must carry
        // the count after the last committed insert.
        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&10));
    }

    #[test]
    fn reentrant_write_from_an_emission_handler_is_refreshed() {
        let store = store();
        let query = store.live(&[Collection::Subjects], |conn| {
            conn.query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get::<_, i64>(0))
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink_store = store.clone();
        let _sub = query.watch(Arc::new(move |count: i64| {
            sink_seen.lock().unwrap().push(count);
            // Mirror the first insert once, from inside the handler.
            if count == 1 {
                sink_store
                    .with_conn(|conn| {
                        conn.execute(
                            "INSERT INTO subjects (name, goal_hours) VALUES ('Echo', 5.0)",
                            [],
                        )
                    })
                    .expect("handler insert");
                sink_store.notify(&[Collection::Subjects]);
            }
        }));

        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO subjects (name, goal_hours) VALUES ('Math', 5.0)",
                    [],
                )
            })
            .expect("insert");
        store.notify(&[Collection::Subjects]);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn cancelled_watcher_is_removed() {
        let store = store();
        let query = store.live(&[Collection::Tasks], |conn| {
            conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get::<_, i64>(0))
        });

        let mut sub = query.watch(Arc::new(|_| {}));
        assert_eq!(store.watcher_count(), 1);
        sub.cancel();
        assert_eq!(store.watcher_count(), 0);
    }

    #[test]
    fn unrelated_collection_does_not_refresh() {
        let store = store();
        let query = store.live(&[Collection::Sessions], |conn| {
            conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get::<_, i64>(0))
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let _sub = query.watch(Arc::new(move |v| sink_seen.lock().unwrap().push(v)));

        store.notify(&[Collection::Subjects]);
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }
}
