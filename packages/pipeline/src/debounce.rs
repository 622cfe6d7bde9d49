//! Last-write-wins debouncing for search-as-you-type callers.
//!
//! Library API for embedding front ends (map widgets, editor plugins)
//! that fire a lookup on every keystroke. Pair it with
//! [`SearchController`](crate::controller::SearchController) so a slow
//! response for an older query cannot replace a newer one. The bundled
//! CLI and server take whole queries and do not debounce.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

type Action<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Delays an action until submissions stop arriving for `delay`.
///
/// Each [`submit`](Self::submit) aborts the pending timer and starts a
/// new one, so only the last value in a burst reaches the action. Must be
/// used inside a tokio runtime.
pub struct Debouncer<T> {
    delay: Duration,
    action: Action<T>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Creates a debouncer that runs `action` after `delay` of quiet.
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn(T) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            delay,
            action: Arc::new(action),
            pending: Mutex::new(None),
        }
    }

    /// Schedules `value`, replacing any value still waiting.
    pub fn submit(&self, value: T) {
        let delay = self.delay;
        let action = self.action.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action(value).await;
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Drops the waiting value, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    /// Returns `true` while a submitted value has not yet fired.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
