//! Cancellable subscription handles.

/// Handle tied to one registered watcher.
///
/// Cancelling runs the teardown closure exactly once; dropping the handle
/// cancels implicitly.
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Cancels the subscription. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    /// Returns whether the subscription has not been cancelled yet.
    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn cancel_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.is_active());
        sub.cancel();
        sub.cancel();
        assert!(!sub.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        drop(Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
