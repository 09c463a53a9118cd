//! Explicit opt-in tracker.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::host::BufferId;

use super::Tracker;

/// Shared set of explicitly tracked buffer identities.
pub type TrackedSet = Arc<Mutex<HashSet<BufferId>>>;

/// Tracker driven solely by explicit track/untrack operations.
///
/// Membership in the shared set is managed by the engine's `track` /
/// `set_enabled` operations; attach has nothing to do.
#[derive(Debug, Clone)]
pub struct ManualTracker {
    tracked: TrackedSet,
}

impl ManualTracker {
    pub fn new(tracked: TrackedSet) -> Self {
        Self { tracked }
    }
}

impl Tracker for ManualTracker {
    fn attach(&mut self, _buf: BufferId, _path: Option<&Path>) {}

    fn detach(&mut self, buf: BufferId) {
        self.tracked.lock().unwrap().remove(&buf);
    }

    fn is_enabled(&self, buf: BufferId) -> bool {
        self.tracked.lock().unwrap().contains(&buf)
    }
}
