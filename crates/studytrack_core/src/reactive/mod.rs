//! Push-based reactive primitives.
//!
//! # Responsibility
//! - Define the `Watchable` seam shared by live queries and local state.
//! - Provide cancellable subscriptions, a mutable local state slice, and the
//!   derived-state combinator with grace-period teardown.
//!
//! # Invariants
//! - Cancellation is synchronous and idempotent.
//! - Emission handlers run outside any storage lock; they may issue writes
//!   but must return promptly.

use std::sync::{Arc, Mutex, MutexGuard};

pub mod derived;
pub mod local;
mod subscription;

pub use derived::{Consumer, Derived, Inputs, DEFAULT_GRACE_PERIOD};
pub use local::LocalSlice;
pub use subscription::Subscription;

/// Callback receiving each emitted value.
pub type WatchSink<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A source of values that delivers its current value immediately on watch
/// and re-delivers whenever the value may have changed.
pub trait Watchable<T> {
    /// Registers `sink`, emits the current value to it, and keeps emitting
    /// until the returned subscription is cancelled or dropped.
    fn watch(&self, sink: WatchSink<T>) -> Subscription;
}

/// Locks a mutex, recovering the inner value if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
