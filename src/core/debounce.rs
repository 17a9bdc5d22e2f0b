//! Debounced triggers.
//!
//! Coalesces bursts of input into a single delayed action per key. Only the
//! most recently scheduled action for a key survives; earlier ones are
//! aborted before they run. Dropping the debouncer aborts everything still
//! pending, so no timer outlives its owner.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default quiet period for repository-URL driven branch discovery.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

/// Keyed debouncer backed by tokio tasks.
#[derive(Debug)]
pub struct Debouncer<K: Eq + Hash> {
    pending: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K: Eq + Hash> Default for Debouncer<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> Debouncer<K> {
    /// Create an empty debouncer.
    pub fn new() -> Self {
        Self { pending: Mutex::new(HashMap::new()) }
    }

    /// Schedule `action` to run once `delay` has elapsed without another
    /// schedule for the same key.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            action.await;
        });

        if let Some(previous) = self.pending.lock().insert(key, handle) {
            previous.abort();
        }
    }

    /// Cancel the pending action for `key`, if any.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.lock().remove(key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending action.
    pub fn cancel_all(&self) {
        for (_, handle) in self.pending.lock().drain() {
            handle.abort();
        }
    }

    /// Whether an action for `key` is scheduled and has not finished.
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.lock().get(key).is_some_and(|handle| !handle.is_finished())
    }
}

impl<K: Eq + Hash> Drop for Debouncer<K> {
    fn drop(&mut self) {
        for (_, handle) in self.pending.get_mut().drain() {
            handle.abort();
        }
    }
}
