//! Conflict-marker parsing and per-line classification.
//!
//! The parser is a pure, stateless forward scan over a snapshot of buffer
//! lines. It recognises `<<<<<<<` / `=======` / `>>>>>>>` runs via
//! configurable prefix matchers and produces one [`ConflictRegion`] per
//! well-formed marker block. Malformed input is never an error: stray
//! delimiters are skipped and unterminated regions are silently dropped.

use regex_lite::Regex;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One parsed conflict block. All line numbers are 1-based positions within
/// the scanned snapshot. Regions are produced fresh on every scan and never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRegion {
    /// Line carrying the current-side marker (`<<<<<<<`).
    pub start_line: usize,
    /// Line carrying the delimiter (`=======`).
    pub delimiter_line: usize,
    /// Line carrying the incoming-side marker (`>>>>>>>`).
    pub end_line: usize,
    /// Text following the start marker, if any.
    pub current_label: Option<String>,
    /// Text following the end marker, if any.
    pub incoming_label: Option<String>,
    /// Body lines between the start marker and the delimiter.
    pub current_body: Vec<String>,
    /// Body lines between the delimiter and the end marker.
    pub incoming_body: Vec<String>,
}

/// Which highlight a single line inside a conflict region receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    CurrentHeader,
    CurrentBody,
    Delimiter,
    IncomingBody,
    IncomingHeader,
    /// Marker for the common-ancestor section of a diff3-style conflict.
    /// Declared for extension; no default matcher produces it.
    BaseDelimiter,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CurrentHeader => write!(f, "current_header"),
            Self::CurrentBody => write!(f, "current_body"),
            Self::Delimiter => write!(f, "delimiter"),
            Self::IncomingBody => write!(f, "incoming_body"),
            Self::IncomingHeader => write!(f, "incoming_header"),
            Self::BaseDelimiter => write!(f, "base_delimiter"),
        }
    }
}

/// A line's classification together with the header label it carries, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMark {
    pub kind: MarkerKind,
    pub label: Option<String>,
}

impl LineMark {
    pub fn new(kind: MarkerKind) -> Self {
        Self { kind, label: None }
    }

    pub fn labeled(kind: MarkerKind, label: Option<String>) -> Self {
        Self { kind, label }
    }
}

// ---------------------------------------------------------------------------
// Matchers
// ---------------------------------------------------------------------------

/// The three line-prefix matchers driving the scan.
///
/// Each pattern is anchored at the start of the line and tolerates trailing
/// annotations; a full-line match is never required.
#[derive(Debug, Clone)]
pub struct MarkerMatchers {
    current: Regex,
    delimiter: Regex,
    incoming: Regex,
}

impl MarkerMatchers {
    /// Tolerant matchers: at least four repeated marker characters, with
    /// everything after the run and a single separator captured as the
    /// label. This accepts conventional variable-length marker lines.
    pub fn tolerant() -> Self {
        Self {
            current: Regex::new(r"^<{4,} ?(.*)$").unwrap(),
            delimiter: Regex::new(r"^={4,}").unwrap(),
            incoming: Regex::new(r"^>{4,} ?(.*)$").unwrap(),
        }
    }

    /// Bit-exact git marker grammar: exactly seven marker characters and a
    /// mandatory non-whitespace label on the header lines.
    pub fn exact() -> Self {
        Self {
            current: Regex::new(r"^<<<<<<< (\S+)").unwrap(),
            delimiter: Regex::new(r"^=======").unwrap(),
            incoming: Regex::new(r"^>>>>>>> (\S+)").unwrap(),
        }
    }

    fn match_current(&self, line: &str) -> Option<Option<String>> {
        capture_label(&self.current, line)
    }

    fn match_delimiter(&self, line: &str) -> bool {
        self.delimiter.is_match(line)
    }

    fn match_incoming(&self, line: &str) -> Option<Option<String>> {
        capture_label(&self.incoming, line)
    }
}

impl Default for MarkerMatchers {
    fn default() -> Self {
        Self::tolerant()
    }
}

/// `Some(label)` when the line matches, where the label itself is `None` for
/// an empty or absent capture.
fn capture_label(pattern: &Regex, line: &str) -> Option<Option<String>> {
    let caps = pattern.captures(line)?;
    let label = caps
        .get(1)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());
    Some(label)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Scan state for the forward pass.
enum ScanState {
    Searching,
    InsideCurrent,
    InsideIncoming,
}

/// Scan `lines` for conflict-marker regions.
///
/// Single forward pass: a current-marker opens a region, the delimiter
/// switches sides, an incoming-marker closes it. A delimiter seen while
/// searching is ignored, and a region still open at end-of-input yields
/// nothing.
pub fn parse_regions(lines: &[String], matchers: &MarkerMatchers) -> Vec<ConflictRegion> {
    let mut regions = Vec::new();
    let mut state = ScanState::Searching;

    let mut start_line = 0;
    let mut delimiter_line = 0;
    let mut current_label = None;
    let mut current_body: Vec<String> = Vec::new();
    let mut incoming_body: Vec<String> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let lineno = idx + 1;
        match state {
            ScanState::Searching => {
                if let Some(label) = matchers.match_current(line) {
                    start_line = lineno;
                    current_label = label;
                    current_body.clear();
                    incoming_body.clear();
                    state = ScanState::InsideCurrent;
                }
            }
            ScanState::InsideCurrent => {
                if matchers.match_delimiter(line) {
                    delimiter_line = lineno;
                    state = ScanState::InsideIncoming;
                } else {
                    current_body.push(line.clone());
                }
            }
            ScanState::InsideIncoming => {
                if let Some(label) = matchers.match_incoming(line) {
                    regions.push(ConflictRegion {
                        start_line,
                        delimiter_line,
                        end_line: lineno,
                        current_label: current_label.take(),
                        incoming_label: label,
                        current_body: std::mem::take(&mut current_body),
                        incoming_body: std::mem::take(&mut incoming_body),
                    });
                    state = ScanState::Searching;
                } else {
                    incoming_body.push(line.clone());
                }
            }
        }
    }

    regions
}
