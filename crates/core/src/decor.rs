//! Decoration driver.
//!
//! Runs inside the host's repaint callback and only touches the lines the
//! surface is about to draw. Classification entries are one-shot per
//! reconciliation cycle: painting a line removes it from the cache, so
//! repeated repaints of the same range do not reassign decorations. The
//! authoritative position list is untouched here.

use crate::cache::Registry;
use crate::config::EngineConfig;
use crate::host::{BufferId, Decoration, Host};
use crate::marker::{LineMark, MarkerKind};

/// Paint pending classifications for the visible range `[first, last]`.
pub fn paint<H: Host>(
    host: &mut H,
    registry: &mut Registry,
    config: &EngineConfig,
    buf: BufferId,
    first: usize,
    last: usize,
) {
    // A differencing view brings its own highlighting; ours would fight it.
    if host.in_diff_view(buf) {
        host.clear_decorations(buf);
        return;
    }

    let Some(cache) = registry.get_mut(buf) else {
        return;
    };

    if cache.needs_clear {
        host.clear_decorations(buf);
        cache.needs_clear = false;
    }

    for line in first..=last {
        if let Some(mark) = cache.marks.remove(&line) {
            host.add_decoration(buf, decoration_for(config, line, &mark));
        }
    }
}

fn decoration_for(config: &EngineConfig, line: usize, mark: &LineMark) -> Decoration {
    let highlights = &config.highlights;
    let (highlight, overlay) = match mark.kind {
        MarkerKind::CurrentHeader => (
            highlights.header.clone(),
            Some(header_overlay(
                "<<<<<<<",
                mark.label.as_deref(),
                &config.annotations.current,
            )),
        ),
        MarkerKind::IncomingHeader => (
            highlights.header.clone(),
            Some(header_overlay(
                ">>>>>>>",
                mark.label.as_deref(),
                &config.annotations.incoming,
            )),
        ),
        MarkerKind::CurrentBody => (highlights.current.clone(), None),
        MarkerKind::IncomingBody => (highlights.incoming.clone(), None),
        MarkerKind::Delimiter | MarkerKind::BaseDelimiter => {
            (highlights.delimiter.clone(), None)
        }
    };
    Decoration {
        line,
        highlight,
        overlay,
    }
}

fn header_overlay(marker: &str, label: Option<&str>, annotation: &str) -> String {
    match label {
        Some(label) => format!("{marker} {label} {annotation}"),
        None => format!("{marker} {annotation}"),
    }
}
