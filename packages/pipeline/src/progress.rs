//! Progress reporting for batch searches.
//!
//! [`Pipeline::search_many`](crate::Pipeline::search_many) reports one
//! unit per finished query through a [`ProgressCallback`]. The CLI draws
//! `indicatif` bars and spinners from these calls. Callers with nothing
//! to draw on pass [`NullProgress`].

use std::sync::Arc;

/// Receives batch search progress.
///
/// One reporter is shared by every query in a batch, and queries finish
/// in any order, so implementations must be `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Sets how many queries the batch holds.
    fn set_total(&self, total: u64);

    /// Records `delta` more finished queries.
    fn inc(&self, delta: u64);

    /// Replaces the status line (e.g., `"Searching 12 address(es)"`).
    fn set_message(&self, msg: String);

    /// Ends the batch, leaving a summary such as `"9/12 search(es) found
    /// boundaries"` on screen.
    fn finish(&self, msg: String);

    /// Ends a single search and removes its spinner.
    fn finish_and_clear(&self);
}

/// Discards progress.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared [`NullProgress`] for `search_many` callers that do not
/// display anything.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
