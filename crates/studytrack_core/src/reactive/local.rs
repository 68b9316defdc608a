//! Locally owned mutable state slice.
//!
//! The reducer side of a screen writes here; the combinator treats the slice
//! as one more watchable input, so every local edit recombines the derived
//! state just like a storage change does.

use super::{lock, Subscription, WatchSink, Watchable};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

struct LocalInner<L> {
    value: Mutex<L>,
    watchers: Mutex<HashMap<u64, WatchSink<L>>>,
    next_id: Mutex<u64>,
}

/// Shared mutable slice of screen-local state.
///
/// Clones share the same underlying value. Every mutation notifies all
/// current watchers with a clone of the new value.
pub struct LocalSlice<L> {
    inner: Arc<LocalInner<L>>,
}

impl<L> Clone for LocalSlice<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: Clone + Send + 'static> LocalSlice<L> {
    pub fn new(value: L) -> Self {
        Self {
            inner: Arc::new(LocalInner {
                value: Mutex::new(value),
                watchers: Mutex::new(HashMap::new()),
                next_id: Mutex::new(0),
            }),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> L {
        lock(&self.inner.value).clone()
    }

    /// Replaces the current value and notifies watchers.
    pub fn set(&self, value: L) {
        self.update(|current| *current = value);
    }

    /// Mutates the current value in place and notifies watchers.
    pub fn update(&self, mutate: impl FnOnce(&mut L)) {
        let updated = {
            let mut value = lock(&self.inner.value);
            mutate(&mut value);
            value.clone()
        };
        let sinks: Vec<WatchSink<L>> = lock(&self.inner.watchers).values().cloned().collect();
        for sink in sinks {
            sink(updated.clone());
        }
    }
}

impl<L: Clone + Send + 'static> Watchable<L> for LocalSlice<L> {
    fn watch(&self, sink: WatchSink<L>) -> Subscription {
        let id = {
            let mut next_id = lock(&self.inner.next_id);
            let id = *next_id;
            *next_id += 1;
            id
        };
        lock(&self.inner.watchers).insert(id, Arc::clone(&sink));

        sink(self.get());

        let weak: Weak<LocalInner<L>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.watchers).remove(&id);
            }
        })
    }
}
