//! Pluggable per-buffer tracking policies.
//!
//! A tracker decides whether conflict detection should be active for a
//! buffer. Two variants exist: [`ManualTracker`] (explicit opt-in) and
//! [`RepoTracker`] (watches a git working tree for in-progress merge-family
//! operations). Adding a new conflict source means implementing [`Tracker`]
//! only.

pub mod manual;
pub mod repo;

use std::path::Path;

use crate::host::BufferId;

pub use manual::ManualTracker;
pub use repo::RepoTracker;

/// The tracking capability: exactly attach, detach, and an enabled query.
///
/// `detach` must be idempotent and safe on already-detached state.
pub trait Tracker: Send {
    /// Begin tracking `buf`, whose backing file (if any) is `path`.
    fn attach(&mut self, buf: BufferId, path: Option<&Path>);

    /// Stop tracking `buf` and release any per-buffer resources.
    fn detach(&mut self, buf: BufferId);

    /// Whether this tracker currently wants conflict detection for `buf`.
    fn is_enabled(&self, buf: BufferId) -> bool;
}
