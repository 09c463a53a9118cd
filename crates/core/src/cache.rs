//! Per-buffer conflict state and the process-wide registry that owns it.
//!
//! A [`BufferCache`] entry exists for a buffer exactly while tracking is
//! enabled for it. Its classification map and position list are rebuilt
//! wholesale on every reconciliation, never patched incrementally; the map
//! is additionally one-shot, drained line by line as the decoration driver
//! paints.

use std::collections::{BTreeMap, HashMap};

use crate::host::BufferId;
use crate::marker::{ConflictRegion, LineMark, MarkerKind};
use crate::tracker::Tracker;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// The three marker lines of one conflict region, as cached for cursor
/// lookup by the resolution operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictPosition {
    pub current_line: usize,
    pub delimiter_line: usize,
    pub incoming_line: usize,
}

impl ConflictPosition {
    /// Whether `line` falls inside the full marker span, inclusive.
    pub fn contains(&self, line: usize) -> bool {
        self.current_line <= line && line <= self.incoming_line
    }
}

// ---------------------------------------------------------------------------
// Buffer cache
// ---------------------------------------------------------------------------

/// All engine-owned state for one tracked buffer.
pub struct BufferCache {
    /// Line number to classification. One-shot: the decoration driver
    /// removes entries as it paints them.
    pub marks: HashMap<usize, LineMark>,
    /// Ordered conflict positions, authoritative until the next scan.
    pub positions: Vec<ConflictPosition>,
    /// Tracking policies attached to this buffer.
    pub trackers: Vec<Box<dyn Tracker>>,
    /// Whether stale decorations must be cleared before the next paint.
    pub needs_clear: bool,
}

impl BufferCache {
    pub fn new(trackers: Vec<Box<dyn Tracker>>) -> Self {
        Self {
            marks: HashMap::new(),
            positions: Vec::new(),
            trackers,
            needs_clear: false,
        }
    }

    /// OR of every attached tracker's enabled state.
    pub fn is_enabled(&self, buf: BufferId) -> bool {
        self.trackers.iter().any(|t| t.is_enabled(buf))
    }

    /// Drop scan results while keeping the entry (tracking disabled).
    pub fn clear_scan(&mut self) {
        self.marks.clear();
        self.positions.clear();
    }

    /// Rebuild the classification map and position list from fresh parse
    /// results, replacing whatever the previous scan produced.
    pub fn apply_scan(&mut self, regions: &[ConflictRegion]) {
        self.marks.clear();
        self.positions.clear();

        for region in regions {
            let delimiter_line = region.start_line + region.current_body.len() + 1;

            for line in region.start_line..=region.end_line {
                let kind = if line < delimiter_line {
                    MarkerKind::CurrentBody
                } else if line == delimiter_line {
                    MarkerKind::Delimiter
                } else {
                    MarkerKind::IncomingBody
                };
                self.marks.insert(line, LineMark::new(kind));
            }

            // Header lines override their side's body classification and
            // carry the captured labels.
            self.marks.insert(
                region.start_line,
                LineMark::labeled(MarkerKind::CurrentHeader, region.current_label.clone()),
            );
            self.marks.insert(
                region.end_line,
                LineMark::labeled(MarkerKind::IncomingHeader, region.incoming_label.clone()),
            );

            self.positions.push(ConflictPosition {
                current_line: region.start_line,
                delimiter_line,
                incoming_line: region.end_line,
            });
        }
    }

    /// Snapshot of the classification map in line order, for comparisons.
    pub fn marks_snapshot(&self) -> BTreeMap<usize, LineMark> {
        self.marks.iter().map(|(k, v)| (*k, v.clone())).collect()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Process-wide ownership of every [`BufferCache`], keyed by buffer
/// identity. Threaded explicitly through engine operations rather than
/// living in ambient global state.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<BufferId, BufferCache>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, buf: BufferId) -> bool {
        self.entries.contains_key(&buf)
    }

    pub fn get(&self, buf: BufferId) -> Option<&BufferCache> {
        self.entries.get(&buf)
    }

    pub fn get_mut(&mut self, buf: BufferId) -> Option<&mut BufferCache> {
        self.entries.get_mut(&buf)
    }

    pub fn insert(&mut self, buf: BufferId, cache: BufferCache) {
        self.entries.insert(buf, cache);
    }

    pub fn remove(&mut self, buf: BufferId) -> Option<BufferCache> {
        self.entries.remove(&buf)
    }

    pub fn tracked_buffers(&self) -> Vec<BufferId> {
        self.entries.keys().copied().collect()
    }
}
