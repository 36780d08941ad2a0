//! One running application instance and its time-accounting state machine. An
//! application is either Tracked (elapsed time accrues on refresh) or Untracked
//! (elapsed time is frozen); the two states toggle repeatedly over the lifetime of
//! the record without losing or double-counting time.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    category::{Category, CategoryRegistry},
    error::TrackerError,
    process::{ProcessHandle, ProcessQuery},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Tracked,
    Untracked,
}

/// A single application known to the tracker. Holds the resolved process identity,
/// but never the process itself: the record outlives the process, and liveness is
/// re-checked through [ProcessQuery] on every query.
#[derive(Debug)]
pub struct TrackedApplication {
    handle: ProcessHandle,
    display_name: Arc<str>,
    state: TrackingState,
    /// Start of the current unmeasured interval. Meaningful only while Tracked.
    reference_time: DateTime<Utc>,
    elapsed: TimeDelta,
    category: Arc<Category>,
}

impl TrackedApplication {
    /// Builds a record for a freshly resolved process. The display name falls back
    /// from the executable's product name to the raw image name; missing product
    /// metadata never fails construction. New records start Untracked with zero
    /// elapsed time and the default category.
    pub fn new(
        handle: ProcessHandle,
        query: &dyn ProcessQuery,
        now: DateTime<Utc>,
        category: Arc<Category>,
    ) -> Self {
        let display_name = query
            .product_name(&handle)
            .map(Arc::from)
            .unwrap_or_else(|| handle.image_name.clone());
        Self {
            handle,
            display_name,
            state: TrackingState::Untracked,
            reference_time: now,
            elapsed: TimeDelta::zero(),
            category,
        }
    }

    /// Seeds the accumulated total, for integrators restoring a prior session.
    pub fn with_elapsed(mut self, elapsed: TimeDelta) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Toggles the tracking state. Entering Tracked restarts the reference time so
    /// the untracked gap is not counted. Leaving Tracked never touches `elapsed`:
    /// accrual happens only in [Self::refresh], so a stop right after a refresh
    /// cannot double-count the same interval.
    pub fn set_tracked(&mut self, state: bool, now: DateTime<Utc>) {
        if state {
            self.reference_time = now;
        }
        self.state = if state {
            TrackingState::Tracked
        } else {
            TrackingState::Untracked
        };
    }

    /// Accrues the interval since the last refresh, provided the application is
    /// Tracked and its process is confirmed alive. If the process exited while still
    /// flagged Tracked, the total stays frozen at its last value; the external exit
    /// signal is expected to follow with an untrack. Returns the accumulated total
    /// unconditionally.
    pub fn refresh(&mut self, query: &dyn ProcessQuery, now: DateTime<Utc>) -> TimeDelta {
        if self.state == TrackingState::Tracked && self.is_running(query) {
            self.elapsed = self.elapsed + (now - self.reference_time);
            self.reference_time = now;
        }
        self.elapsed
    }

    /// Whether the resolved process is still alive. Always re-checks: process exit
    /// is an external asynchronous event, so a cached answer would go stale.
    pub fn is_running(&self, query: &dyn ProcessQuery) -> bool {
        query.is_alive(&self.handle)
    }

    /// Reassigns the category through the registry. On an invalid name the current
    /// category is left untouched and the error is surfaced.
    pub fn modify_category(
        &mut self,
        registry: &mut CategoryRegistry,
        name: &str,
    ) -> Result<(), TrackerError> {
        self.category = registry.get_or_create(name)?;
        Ok(())
    }

    pub fn handle(&self) -> &ProcessHandle {
        &self.handle
    }

    pub fn display_name(&self) -> Arc<str> {
        self.display_name.clone()
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn elapsed(&self) -> TimeDelta {
        self.elapsed
    }

    pub fn category(&self) -> Arc<Category> {
        self.category.clone()
    }
}
