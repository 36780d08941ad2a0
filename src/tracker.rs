//! Owns the collection of known applications and orchestrates every mutation on it.
//! Applications are partitioned into tracked and untracked maps, keyed by executable
//! name; an entry lives in exactly one of the two at any time. All operations are
//! expected to run on one serialized execution context (see [crate::monitor]).

use std::collections::HashMap;

use chrono::TimeDelta;
use tracing::debug;

use crate::{
    app::TrackedApplication,
    category::CategoryRegistry,
    error::TrackerError,
    process::{resolver, ProcessQuery},
    utils::clock::Clock,
};

pub struct ApplicationTracker {
    tracked: HashMap<String, TrackedApplication>,
    /// Entries that were added or tracked at some point and are not being timed now.
    untracked: HashMap<String, TrackedApplication>,
    /// Name of the tracked entry currently in the foreground, if any. Mutated only
    /// by [Self::notify_foreground_changed] and by untracking the entry it names.
    foreground: Option<String>,
    categories: CategoryRegistry,
    query: Box<dyn ProcessQuery>,
    clock: Box<dyn Clock>,
}

impl ApplicationTracker {
    pub fn new(query: Box<dyn ProcessQuery>, clock: Box<dyn Clock>) -> Self {
        Self::with_registry(query, clock, CategoryRegistry::new())
    }

    /// Builds a tracker around an externally owned category registry, for composers
    /// that share one registry across components.
    pub fn with_registry(
        query: Box<dyn ProcessQuery>,
        clock: Box<dyn Clock>,
        categories: CategoryRegistry,
    ) -> Self {
        Self {
            tracked: HashMap::new(),
            untracked: HashMap::new(),
            foreground: None,
            categories,
            query,
            clock,
        }
    }

    /// Registers an application by executable name. Identity is resolved through
    /// [resolver::resolve_main]; an unresolvable name fails with
    /// [TrackerError::ProcessNotFound] and changes nothing. New entries start
    /// untracked. Re-adding a known name is a no-op that keeps the existing record.
    pub fn add(&mut self, name: &str) -> Result<(), TrackerError> {
        self.add_entry(name, None)
    }

    /// Like [Self::add], but seeds the accumulated elapsed time from a prior
    /// session, as loaded through [crate::storage].
    pub fn add_seeded(&mut self, name: &str, elapsed: TimeDelta) -> Result<(), TrackerError> {
        self.add_entry(name, Some(elapsed))
    }

    fn add_entry(&mut self, name: &str, seeded: Option<TimeDelta>) -> Result<(), TrackerError> {
        if self.tracked.contains_key(name) || self.untracked.contains_key(name) {
            return Ok(());
        }
        let handle = resolver::resolve_main(self.query.as_ref(), name)?;
        debug!("Resolved '{name}' to pid {}", handle.pid);
        let mut app = TrackedApplication::new(
            handle,
            self.query.as_ref(),
            self.clock.time(),
            self.categories.default_category(),
        );
        if let Some(elapsed) = seeded {
            app = app.with_elapsed(elapsed);
        }
        self.untracked.insert(name.to_owned(), app);
        Ok(())
    }

    /// Moves the named entry into the partition matching `state` and forwards the
    /// toggle to the entry. A no-op when the entry is already in the target
    /// partition or was never added, so repeated calls cannot reset the reference
    /// time of an already-tracked entry.
    pub fn set_tracked(&mut self, name: &str, state: bool) {
        if state {
            if let Some(mut app) = self.untracked.remove(name) {
                app.set_tracked(true, self.clock.time());
                self.tracked.insert(name.to_owned(), app);
            }
        } else if let Some(mut app) = self.tracked.remove(name) {
            app.set_tracked(false, self.clock.time());
            self.untracked.insert(name.to_owned(), app);
            if self.foreground.as_deref() == Some(name) {
                self.foreground = None;
            }
        }
    }

    /// Reassigns the category of a known application. The entry is looked up in
    /// either partition; failures leave its current category untouched.
    pub fn modify_category(&mut self, name: &str, category: &str) -> Result<(), TrackerError> {
        let app = match self.tracked.get_mut(name) {
            Some(app) => app,
            None => self
                .untracked
                .get_mut(name)
                .ok_or_else(|| TrackerError::ApplicationNotFound(name.to_owned()))?,
        };
        app.modify_category(&mut self.categories, category)
    }

    /// Sink for the external foreground-change signal. The foreground pointer is set
    /// to the tracked entry matching `name`, or cleared when that name is not
    /// currently tracked; time only ever accrues for tracked entries.
    pub fn notify_foreground_changed(&mut self, name: &str) {
        self.foreground = self
            .tracked
            .contains_key(name)
            .then(|| name.to_owned());
    }

    /// Periodic-update entry point, driven by an external scheduler. Refreshes only
    /// the foreground application: elapsed time accrues solely for the application
    /// the user is actively in. Returns the foreground entry's accumulated total,
    /// or [None] when nothing is in the foreground.
    pub fn tick(&mut self) -> Option<TimeDelta> {
        let name = self.foreground.as_deref()?;
        let now = self.clock.time();
        let elapsed = self.tracked.get_mut(name)?.refresh(self.query.as_ref(), now);
        debug!("Refreshed '{name}', total {elapsed}");
        Some(elapsed)
    }

    /// Looks a known application up in either partition.
    pub fn application(&self, name: &str) -> Option<&TrackedApplication> {
        self.tracked.get(name).or_else(|| self.untracked.get(name))
    }

    /// Re-checks process liveness for a known application.
    pub fn is_running(&self, name: &str) -> Result<bool, TrackerError> {
        self.application(name)
            .map(|app| app.is_running(self.query.as_ref()))
            .ok_or_else(|| TrackerError::ApplicationNotFound(name.to_owned()))
    }

    pub fn foreground(&self) -> Option<&str> {
        self.foreground.as_deref()
    }

    pub fn tracked_names(&self) -> impl Iterator<Item = &str> {
        self.tracked.keys().map(String::as_str)
    }

    pub fn untracked_names(&self) -> impl Iterator<Item = &str> {
        self.untracked.keys().map(String::as_str)
    }

    /// Iterates every known application with its name, for persistence snapshots.
    pub fn applications(&self) -> impl Iterator<Item = (&str, &TrackedApplication)> {
        self.tracked
            .iter()
            .chain(self.untracked.iter())
            .map(|(name, app)| (name.as_str(), app))
    }

    pub fn add_category(&mut self, name: &str) -> Result<(), TrackerError> {
        self.categories.add(name)
    }

    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<(), TrackerError> {
        self.categories.rename(old, new)
    }

    pub fn remove_category(&mut self, name: &str) -> Result<(), TrackerError> {
        self.categories.remove(name)
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }
}
