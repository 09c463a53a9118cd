//! The boundary between the engine and the hosting editor surface.
//!
//! The engine never owns buffer text, cursors, or rendering. It talks to the
//! editor through the [`Host`] trait: snapshot reads, contiguous line-range
//! writes, decoration registration, and repaint requests. [`MemoryHost`] is
//! a complete in-memory implementation used by the CLI and the test suite.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Identities and decorations
// ---------------------------------------------------------------------------

/// Stable identity for one buffer, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl std::fmt::Display for BufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// One namespaced decoration: a line, a highlight group, and optional
/// overlay text replacing the rendered line content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub line: usize,
    pub highlight: String,
    pub overlay: Option<String>,
}

// ---------------------------------------------------------------------------
// Host trait
// ---------------------------------------------------------------------------

/// Capabilities the engine requires from the hosting editor.
///
/// All line numbers are 1-based. Every method is a cheap synchronous call;
/// the host is expected to answer from its own in-memory state.
pub trait Host {
    /// Whether `buf` still refers to a live buffer.
    fn is_valid(&self, buf: BufferId) -> bool;

    /// Full text snapshot of the buffer, or `None` if it is gone.
    fn lines(&self, buf: BufferId) -> Option<Vec<String>>;

    /// Replace the inclusive line range `[start, end]` with `replacement`.
    /// Returns false when the buffer or range is invalid.
    fn replace_lines(
        &mut self,
        buf: BufferId,
        start: usize,
        end: usize,
        replacement: Vec<String>,
    ) -> bool;

    /// Line the cursor currently sits on in `buf`, if the buffer is live.
    fn cursor_line(&self, buf: BufferId) -> Option<usize>;

    /// Real filesystem path backing the buffer, if any.
    fn path(&self, buf: BufferId) -> Option<PathBuf>;

    /// Register one decoration in the engine's namespace.
    fn add_decoration(&mut self, buf: BufferId, decoration: Decoration);

    /// Drop every decoration in the engine's namespace for `buf`.
    fn clear_decorations(&mut self, buf: BufferId);

    /// Ask the surface to repaint `buf` at its next opportunity.
    fn request_repaint(&mut self, buf: BufferId);

    /// Open a new scratch buffer seeded with `lines`, returning its identity.
    fn open_scratch(&mut self, lines: Vec<String>) -> BufferId;

    /// Put `left` and `right` into a side-by-side differencing view.
    fn enter_diff_view(&mut self, left: BufferId, right: BufferId);

    /// Whether `buf` currently participates in a differencing view.
    fn in_diff_view(&self, buf: BufferId) -> bool;
}

// ---------------------------------------------------------------------------
// In-memory host
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryBuffer {
    lines: Vec<String>,
    cursor: usize,
    path: Option<PathBuf>,
    decorations: Vec<Decoration>,
    in_diff: bool,
}

/// In-memory [`Host`] implementation.
///
/// Backs the CLI's file-based commands and every engine test. Repaint
/// requests are recorded rather than acted on; the embedder drains them and
/// calls back into the decoration driver.
#[derive(Debug, Default)]
pub struct MemoryHost {
    buffers: HashMap<BufferId, MemoryBuffer>,
    next_id: u64,
    repaints: Vec<BufferId>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer from the given lines.
    pub fn create_buffer(&mut self, lines: Vec<String>) -> BufferId {
        self.create_buffer_at(lines, None)
    }

    /// Create a buffer backed by a filesystem path.
    pub fn create_buffer_at(&mut self, lines: Vec<String>, path: Option<PathBuf>) -> BufferId {
        self.next_id += 1;
        let id = BufferId(self.next_id);
        self.buffers.insert(
            id,
            MemoryBuffer {
                lines,
                cursor: 1,
                path,
                ..MemoryBuffer::default()
            },
        );
        id
    }

    /// Invalidate a buffer, as if the user closed it.
    pub fn close_buffer(&mut self, buf: BufferId) {
        self.buffers.remove(&buf);
    }

    pub fn set_cursor(&mut self, buf: BufferId, line: usize) {
        if let Some(b) = self.buffers.get_mut(&buf) {
            b.cursor = line;
        }
    }

    /// Decorations currently registered for `buf`.
    pub fn decorations(&self, buf: BufferId) -> &[Decoration] {
        self.buffers
            .get(&buf)
            .map(|b| b.decorations.as_slice())
            .unwrap_or(&[])
    }

    /// Drain the recorded repaint requests.
    pub fn take_repaints(&mut self) -> Vec<BufferId> {
        std::mem::take(&mut self.repaints)
    }

    /// Leave the differencing view for `buf`.
    pub fn leave_diff_view(&mut self, buf: BufferId) {
        if let Some(b) = self.buffers.get_mut(&buf) {
            b.in_diff = false;
        }
    }
}

impl Host for MemoryHost {
    fn is_valid(&self, buf: BufferId) -> bool {
        self.buffers.contains_key(&buf)
    }

    fn lines(&self, buf: BufferId) -> Option<Vec<String>> {
        self.buffers.get(&buf).map(|b| b.lines.clone())
    }

    fn replace_lines(
        &mut self,
        buf: BufferId,
        start: usize,
        end: usize,
        replacement: Vec<String>,
    ) -> bool {
        let Some(b) = self.buffers.get_mut(&buf) else {
            return false;
        };
        if start == 0 || start > end || end > b.lines.len() {
            return false;
        }
        b.lines.splice(start - 1..end, replacement);
        true
    }

    fn cursor_line(&self, buf: BufferId) -> Option<usize> {
        self.buffers.get(&buf).map(|b| b.cursor)
    }

    fn path(&self, buf: BufferId) -> Option<PathBuf> {
        self.buffers.get(&buf).and_then(|b| b.path.clone())
    }

    fn add_decoration(&mut self, buf: BufferId, decoration: Decoration) {
        if let Some(b) = self.buffers.get_mut(&buf) {
            b.decorations.push(decoration);
        }
    }

    fn clear_decorations(&mut self, buf: BufferId) {
        if let Some(b) = self.buffers.get_mut(&buf) {
            b.decorations.clear();
        }
    }

    fn request_repaint(&mut self, buf: BufferId) {
        self.repaints.push(buf);
    }

    fn open_scratch(&mut self, lines: Vec<String>) -> BufferId {
        self.create_buffer(lines)
    }

    fn enter_diff_view(&mut self, left: BufferId, right: BufferId) {
        for id in [left, right] {
            if let Some(b) = self.buffers.get_mut(&id) {
                b.in_diff = true;
            }
        }
    }

    fn in_diff_view(&self, buf: BufferId) -> bool {
        self.buffers.get(&buf).map(|b| b.in_diff).unwrap_or(false)
    }
}

/// Convenience for loading a file into a [`MemoryHost`] buffer.
///
/// An empty file loads as a single empty line, as it would in an editor,
/// so a full-span `replace_lines` on the result always has a line to
/// target.
pub fn load_file(host: &mut MemoryHost, path: &Path) -> std::io::Result<BufferId> {
    let text = std::fs::read_to_string(path)?;
    let mut lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    Ok(host.create_buffer_at(lines, Some(path.to_path_buf())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_and_read() {
        let mut host = MemoryHost::new();
        let buf = host.create_buffer(lines(&["a", "b"]));
        assert!(host.is_valid(buf));
        assert_eq!(host.lines(buf).unwrap(), lines(&["a", "b"]));
        assert_eq!(host.cursor_line(buf), Some(1));
    }

    #[test]
    fn test_replace_range() {
        let mut host = MemoryHost::new();
        let buf = host.create_buffer(lines(&["a", "b", "c", "d"]));
        assert!(host.replace_lines(buf, 2, 3, lines(&["X"])));
        assert_eq!(host.lines(buf).unwrap(), lines(&["a", "X", "d"]));
    }

    #[test]
    fn test_replace_with_empty_deletes() {
        let mut host = MemoryHost::new();
        let buf = host.create_buffer(lines(&["a", "b", "c"]));
        assert!(host.replace_lines(buf, 1, 2, vec![]));
        assert_eq!(host.lines(buf).unwrap(), lines(&["c"]));
    }

    #[test]
    fn test_replace_rejects_bad_range() {
        let mut host = MemoryHost::new();
        let buf = host.create_buffer(lines(&["a"]));
        assert!(!host.replace_lines(buf, 0, 1, vec![]));
        assert!(!host.replace_lines(buf, 1, 2, vec![]));
        assert!(!host.replace_lines(BufferId(999), 1, 1, vec![]));
    }

    #[test]
    fn test_close_invalidates() {
        let mut host = MemoryHost::new();
        let buf = host.create_buffer(lines(&["a"]));
        host.close_buffer(buf);
        assert!(!host.is_valid(buf));
        assert_eq!(host.lines(buf), None);
    }

    #[test]
    fn test_load_empty_file_yields_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();

        let mut host = MemoryHost::new();
        let buf = load_file(&mut host, &path).unwrap();
        assert_eq!(host.lines(buf).unwrap(), vec![String::new()]);

        // A truncated-then-refilled file must stay replaceable: the single
        // empty line gives the full-span rewrite a valid target.
        assert!(host.replace_lines(buf, 1, 1, lines(&["refilled", "content"])));
        assert_eq!(host.lines(buf).unwrap(), lines(&["refilled", "content"]));
    }

    #[test]
    fn test_diff_view_flags_both_sides() {
        let mut host = MemoryHost::new();
        let left = host.create_buffer(lines(&["a"]));
        let right = host.open_scratch(lines(&["b"]));
        host.enter_diff_view(left, right);
        assert!(host.in_diff_view(left));
        assert!(host.in_diff_view(right));
        host.leave_diff_view(left);
        assert!(!host.in_diff_view(left));
    }
}
