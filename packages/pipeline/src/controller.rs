//! Search state for interactive callers.
//!
//! Every search started through a [`SearchController`] gets a request id
//! from a monotonic counter. When a response arrives, it is applied only
//! if its id is still the latest one; an older response that finishes
//! late is dropped instead of overwriting a newer result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::source::BoundaryQuery;
use crate::{Pipeline, PipelineError, SearchOutcome};

/// Where the current search stands.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SearchState {
    /// Nothing searched yet, or reset.
    #[default]
    Idle,
    /// A search is in flight.
    Searching {
        /// Id of the in-flight request.
        request_id: u64,
    },
    /// The latest search succeeded.
    Success(SearchOutcome),
    /// The latest search failed.
    Error(String),
}

/// What happened to a finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResolution {
    /// The result was stored as the current state.
    Applied,
    /// A newer request had started; the result was discarded.
    Superseded {
        /// Id of the discarded request.
        request_id: u64,
        /// Id of the newest request.
        latest: u64,
    },
}

/// Runs searches and keeps only the newest result.
pub struct SearchController {
    pipeline: Arc<Pipeline>,
    latest: AtomicU64,
    state: Mutex<SearchState>,
}

impl SearchController {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            latest: AtomicU64::new(0),
            state: Mutex::new(SearchState::Idle),
        }
    }

    /// Starts a request: takes the next id and moves to `Searching`.
    ///
    /// The id is taken under the state lock, so a newer request's result
    /// can never be overwritten by an older request's `Searching` state.
    pub fn begin(&self) -> u64 {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let request_id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        *state = SearchState::Searching { request_id };
        request_id
    }

    /// Finishes request `request_id`, applying its result only if no newer
    /// request has begun.
    pub fn complete(
        &self,
        request_id: u64,
        result: Result<SearchOutcome, PipelineError>,
    ) -> SearchResolution {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let latest = self.latest.load(Ordering::SeqCst);
        if request_id != latest {
            log::debug!("Discarding response for request {request_id}, latest is {latest}");
            return SearchResolution::Superseded { request_id, latest };
        }

        *state = match result {
            Ok(outcome) => SearchState::Success(outcome),
            Err(e) => SearchState::Error(e.to_string()),
        };
        SearchResolution::Applied
    }

    /// Runs a search through the pipeline and applies its result.
    pub async fn search(&self, query: &BoundaryQuery) -> SearchResolution {
        let request_id = self.begin();
        let result = self.pipeline.search(query).await;
        self.complete(request_id, result)
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SearchState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns to `Idle`. Requests still in flight become stale.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.latest.fetch_add(1, Ordering::SeqCst);
        *state = SearchState::Idle;
    }
}
