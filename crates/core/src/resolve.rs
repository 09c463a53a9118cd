//! Conflict resolution operations.
//!
//! Each operation locates the conflict region under the buffer's cursor and
//! rewrites the full marker span. Side bodies are sliced from the live
//! buffer snapshot at application time, not from the scan that produced the
//! cached positions, so text edited since the last reconciliation is
//! honored. Invoking an operation with no region under the cursor is a
//! silent no-op.

use tracing::{debug, info};

use crate::cache::{ConflictPosition, Registry};
use crate::host::{BufferId, Host};

/// Named resolution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Keep only the current-side body.
    Current,
    /// Keep only the incoming-side body.
    Incoming,
    /// Keep the current-side body followed by the incoming-side body.
    Both,
    /// Delete the whole marker span.
    Reject,
    /// Keep the current side here and open the incoming side in a
    /// side-by-side differencing view.
    Diff,
}

impl std::fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Incoming => write!(f, "incoming"),
            Self::Both => write!(f, "both"),
            Self::Reject => write!(f, "reject"),
            Self::Diff => write!(f, "diff"),
        }
    }
}

/// Apply `kind` to the conflict under the cursor in `buf`.
///
/// Returns true when the buffer was mutated; the caller is responsible for
/// scheduling the follow-up re-scan. Never errors: every failure mode
/// (untracked buffer, no cursor, no containing region, span out of date)
/// leaves the buffer untouched.
pub fn apply<H: Host>(
    host: &mut H,
    registry: &Registry,
    buf: BufferId,
    kind: ResolutionKind,
) -> bool {
    let Some(cache) = registry.get(buf) else {
        return false;
    };
    let Some(cursor) = host.cursor_line(buf) else {
        return false;
    };
    // First containing triple wins; regions are non-overlapping within one
    // scan so at most one can match.
    let Some(pos) = cache.positions.iter().find(|p| p.contains(cursor)).copied() else {
        debug!(%buf, cursor, "no conflict under cursor");
        return false;
    };
    let Some(lines) = host.lines(buf) else {
        return false;
    };
    if !span_is_current(&pos, &lines) {
        debug!(%buf, ?pos, "cached span no longer valid, ignoring");
        return false;
    }

    // 1-based marker lines to 0-based body slices.
    let current_body = lines[pos.current_line..pos.delimiter_line - 1].to_vec();
    let incoming_body = lines[pos.delimiter_line..pos.incoming_line - 1].to_vec();

    info!(%buf, %kind, start = pos.current_line, end = pos.incoming_line, "resolving conflict");

    match kind {
        ResolutionKind::Current => {
            host.replace_lines(buf, pos.current_line, pos.incoming_line, current_body);
        }
        ResolutionKind::Incoming => {
            host.replace_lines(buf, pos.current_line, pos.incoming_line, incoming_body);
        }
        ResolutionKind::Both => {
            let mut merged = current_body;
            merged.extend(incoming_body);
            host.replace_lines(buf, pos.current_line, pos.incoming_line, merged);
        }
        ResolutionKind::Reject => {
            host.replace_lines(buf, pos.current_line, pos.incoming_line, Vec::new());
        }
        ResolutionKind::Diff => {
            // Scratch buffer: the full original content with the span
            // replaced by the incoming side.
            let mut scratch: Vec<String> = lines[..pos.current_line - 1].to_vec();
            scratch.extend(incoming_body);
            scratch.extend(lines[pos.incoming_line..].iter().cloned());

            host.replace_lines(buf, pos.current_line, pos.incoming_line, current_body);
            let scratch_buf = host.open_scratch(scratch);
            host.enter_diff_view(buf, scratch_buf);
        }
    }
    true
}

/// Defensive check that the cached marker span still fits the live text.
fn span_is_current(pos: &ConflictPosition, lines: &[String]) -> bool {
    pos.current_line >= 1
        && pos.current_line < pos.delimiter_line
        && pos.delimiter_line < pos.incoming_line
        && pos.incoming_line <= lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BufferCache;
    use crate::host::MemoryHost;
    use crate::marker::{parse_regions, MarkerMatchers};

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    const CONFLICTED: &[&str] = &[
        "a",
        "<<<<<<< HEAD",
        "x",
        "=======",
        "y",
        ">>>>>>> branch",
        "b",
    ];

    fn setup(src: &[&str]) -> (MemoryHost, Registry, BufferId) {
        let mut host = MemoryHost::new();
        let buf = host.create_buffer(lines(src));
        let mut cache = BufferCache::new(Vec::new());
        cache.apply_scan(&parse_regions(&lines(src), &MarkerMatchers::tolerant()));
        let mut registry = Registry::new();
        registry.insert(buf, cache);
        (host, registry, buf)
    }

    #[test]
    fn test_accept_current() {
        let (mut host, registry, buf) = setup(CONFLICTED);
        host.set_cursor(buf, 3);
        assert!(apply(&mut host, &registry, buf, ResolutionKind::Current));
        assert_eq!(host.lines(buf).unwrap(), lines(&["a", "x", "b"]));
    }

    #[test]
    fn test_accept_incoming() {
        let (mut host, registry, buf) = setup(CONFLICTED);
        host.set_cursor(buf, 4);
        assert!(apply(&mut host, &registry, buf, ResolutionKind::Incoming));
        assert_eq!(host.lines(buf).unwrap(), lines(&["a", "y", "b"]));
    }

    #[test]
    fn test_accept_both_preserves_order() {
        let (mut host, registry, buf) = setup(CONFLICTED);
        host.set_cursor(buf, 2);
        assert!(apply(&mut host, &registry, buf, ResolutionKind::Both));
        assert_eq!(host.lines(buf).unwrap(), lines(&["a", "x", "y", "b"]));
    }

    #[test]
    fn test_both_line_count_is_sum_of_bodies() {
        let src = &[
            "<<<<<<< a",
            "c1",
            "c2",
            "c3",
            "=======",
            "i1",
            "i2",
            ">>>>>>> b",
        ];
        let (mut host, registry, buf) = setup(src);
        host.set_cursor(buf, 1);
        assert!(apply(&mut host, &registry, buf, ResolutionKind::Both));
        let result = host.lines(buf).unwrap();
        assert_eq!(result.len(), 3 + 2);
        assert_eq!(result, lines(&["c1", "c2", "c3", "i1", "i2"]));
    }

    #[test]
    fn test_reject_removes_span_exactly() {
        let (mut host, registry, buf) = setup(CONFLICTED);
        host.set_cursor(buf, 6);
        assert!(apply(&mut host, &registry, buf, ResolutionKind::Reject));
        assert_eq!(host.lines(buf).unwrap(), lines(&["a", "b"]));
    }

    #[test]
    fn test_cursor_outside_region_is_noop() {
        let (mut host, registry, buf) = setup(CONFLICTED);
        host.set_cursor(buf, 1);
        assert!(!apply(&mut host, &registry, buf, ResolutionKind::Current));
        assert_eq!(host.lines(buf).unwrap(), lines(CONFLICTED));

        host.set_cursor(buf, 7);
        assert!(!apply(&mut host, &registry, buf, ResolutionKind::Reject));
        assert_eq!(host.lines(buf).unwrap(), lines(CONFLICTED));
    }

    #[test]
    fn test_untracked_buffer_is_noop() {
        let mut host = MemoryHost::new();
        let buf = host.create_buffer(lines(CONFLICTED));
        let registry = Registry::new();
        assert!(!apply(&mut host, &registry, buf, ResolutionKind::Current));
    }

    #[test]
    fn test_stale_span_is_noop() {
        let (mut host, registry, buf) = setup(CONFLICTED);
        // Text shrank since the scan; the cached span hangs past the end.
        host.replace_lines(buf, 5, 7, vec![]);
        host.set_cursor(buf, 3);
        assert!(!apply(&mut host, &registry, buf, ResolutionKind::Current));
    }

    #[test]
    fn test_second_region_resolved_independently() {
        let src = &[
            "<<<<<<< a",
            "1",
            "=======",
            "2",
            ">>>>>>> b",
            "mid",
            "<<<<<<< c",
            "3",
            "=======",
            "4",
            ">>>>>>> d",
        ];
        let (mut host, registry, buf) = setup(src);
        host.set_cursor(buf, 9);
        assert!(apply(&mut host, &registry, buf, ResolutionKind::Incoming));
        assert_eq!(
            host.lines(buf).unwrap(),
            lines(&["<<<<<<< a", "1", "=======", "2", ">>>>>>> b", "mid", "4"])
        );
    }

    #[test]
    fn test_open_diff_splits_sides() {
        let (mut host, registry, buf) = setup(CONFLICTED);
        host.set_cursor(buf, 4);
        assert!(apply(&mut host, &registry, buf, ResolutionKind::Diff));

        // Original keeps the current side, exactly as accept-current.
        assert_eq!(host.lines(buf).unwrap(), lines(&["a", "x", "b"]));
        assert!(host.in_diff_view(buf));

        // The scratch buffer carries the incoming rendition of the file.
        let scratch = BufferId(buf.0 + 1);
        assert_eq!(host.lines(scratch).unwrap(), lines(&["a", "y", "b"]));
        assert!(host.in_diff_view(scratch));
    }

    #[test]
    fn test_bodies_sliced_from_live_text() {
        let (mut host, registry, buf) = setup(CONFLICTED);
        // Edit the current-side body after the scan; span lines unchanged.
        host.replace_lines(buf, 3, 3, lines(&["edited"]));
        host.set_cursor(buf, 3);
        assert!(apply(&mut host, &registry, buf, ResolutionKind::Current));
        assert_eq!(host.lines(buf).unwrap(), lines(&["a", "edited", "b"]));
    }
}
