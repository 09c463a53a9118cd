//! The conflict-tracking engine.
//!
//! [`Engine`] owns the buffer registry, the update scheduler, and the host
//! handle, and drains the event queue sequentially: no two reconciliations
//! ever run concurrently, and a reconciliation always observes the buffer's
//! text and tracker state at the moment it runs, never at schedule time.
//!
//! Host callbacks call the public methods directly; timer tasks, filesystem
//! watchers, and subprocess continuations come back through the
//! [`EngineHandle`] event queue.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::cache::{BufferCache, Registry};
use crate::config::{EngineConfig, MarkerStyle};
use crate::decor;
use crate::events::{self, EngineEvent, EngineHandle};
use crate::git::GitClient;
use crate::host::{BufferId, Host};
use crate::marker::{parse_regions, MarkerMatchers};
use crate::resolve::{self, ResolutionKind};
use crate::scheduler::UpdateScheduler;
use crate::tracker::{manual::TrackedSet, ManualTracker, RepoTracker, Tracker};

/// Conflict-marker tracking engine over one host surface.
pub struct Engine<H: Host> {
    host: H,
    config: EngineConfig,
    matchers: MarkerMatchers,
    registry: Registry,
    scheduler: UpdateScheduler,
    manual: TrackedSet,
    git: GitClient,
    handle: EngineHandle,
    rx: UnboundedReceiver<EngineEvent>,
}

impl<H: Host> Engine<H> {
    /// Create an engine over `host`. Must be called within a tokio runtime.
    pub fn new(host: H, config: EngineConfig) -> Self {
        let (handle, rx) = events::channel();
        let matchers = match config.marker_style {
            MarkerStyle::Tolerant => MarkerMatchers::tolerant(),
            MarkerStyle::Exact => MarkerMatchers::exact(),
        };
        let git = GitClient::new(config.git_program.clone());
        Self {
            host,
            matchers,
            registry: Registry::new(),
            scheduler: UpdateScheduler::new(handle.clone()),
            manual: Arc::new(Mutex::new(Default::default())),
            git,
            handle,
            rx,
            config,
        }
    }

    /// Cloneable sender for watcher callbacks and embedders.
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Whether a cache entry exists for `buf`.
    pub fn is_tracked(&self, buf: BufferId) -> bool {
        self.registry.contains(buf)
    }

    /// Conflict positions from the last reconciliation of `buf`.
    pub fn positions(&self, buf: BufferId) -> Vec<crate::cache::ConflictPosition> {
        self.registry
            .get(buf)
            .map(|c| c.positions.clone())
            .unwrap_or_default()
    }

    fn manual_set(&self) -> std::sync::MutexGuard<'_, std::collections::HashSet<BufferId>> {
        self.manual.lock().unwrap()
    }

    // -----------------------------------------------------------------------
    // Lifecycle operations
    // -----------------------------------------------------------------------

    /// Enable tracking for `buf`: create its cache entry, attach the manual
    /// and repository trackers, and schedule an immediate first scan.
    pub fn track(&mut self, buf: BufferId) {
        if !self.host.is_valid(buf) {
            debug!(%buf, "track requested for invalid buffer");
            return;
        }
        self.manual_set().insert(buf);

        if !self.registry.contains(buf) {
            let path = self.host.path(buf);
            let mut trackers: Vec<Box<dyn Tracker>> = vec![
                Box::new(ManualTracker::new(self.manual.clone())),
                Box::new(RepoTracker::new(
                    self.git.clone(),
                    Duration::from_millis(self.config.requery_debounce_ms),
                    self.handle.clone(),
                )),
            ];
            for tracker in &mut trackers {
                tracker.attach(buf, path.as_deref());
            }
            self.registry.insert(buf, BufferCache::new(trackers));
            info!(%buf, "tracking enabled");
        }
        self.scheduler.schedule(buf, Duration::ZERO);
    }

    /// Disable tracking for `buf`: detach every tracker, destroy the cache
    /// entry, and clear any decorations still on screen.
    pub fn untrack(&mut self, buf: BufferId) {
        self.manual_set().remove(&buf);
        self.scheduler.forget(buf);
        if let Some(mut cache) = self.registry.remove(buf) {
            for tracker in &mut cache.trackers {
                tracker.detach(buf);
            }
            info!(%buf, "tracking disabled");
        }
        if self.host.is_valid(buf) {
            self.host.clear_decorations(buf);
        }
    }

    /// Toggle the manual tracker's opt-in for `buf` without destroying the
    /// cache entry. With every tracker disabled the next reconciliation
    /// clears the scan state; re-enabling restores detection without
    /// re-attaching.
    pub fn set_enabled(&mut self, buf: BufferId, enabled: bool) {
        if !self.registry.contains(buf) {
            return;
        }
        let mut manual = self.manual_set();
        if enabled {
            manual.insert(buf);
        } else {
            manual.remove(&buf);
        }
        drop(manual);
        self.scheduler.schedule(buf, Duration::ZERO);
    }

    // -----------------------------------------------------------------------
    // Host notifications
    // -----------------------------------------------------------------------

    /// The buffer's text changed; coalesce into the debounce window.
    pub fn on_edit(&mut self, buf: BufferId) {
        if self.registry.contains(buf) {
            self.scheduler
                .schedule(buf, Duration::from_millis(self.config.debounce_ms));
        }
    }

    /// The host closed the buffer; tear down without touching the surface.
    pub fn on_buffer_closed(&mut self, buf: BufferId) {
        self.manual_set().remove(&buf);
        self.scheduler.forget(buf);
        if let Some(mut cache) = self.registry.remove(buf) {
            for tracker in &mut cache.trackers {
                tracker.detach(buf);
            }
            debug!(%buf, "buffer closed, cache entry dropped");
        }
    }

    /// Repaint callback: paint pending decorations for the visible range.
    pub fn on_repaint(&mut self, buf: BufferId, first: usize, last: usize) {
        decor::paint(
            &mut self.host,
            &mut self.registry,
            &self.config,
            buf,
            first,
            last,
        );
    }

    /// Apply a resolution at the buffer's cursor, then schedule the
    /// follow-up re-scan. Never reconciles synchronously.
    pub fn resolve(&mut self, buf: BufferId, kind: ResolutionKind) {
        if resolve::apply(&mut self.host, &self.registry, buf, kind) {
            self.scheduler.schedule(buf, Duration::ZERO);
        }
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Process one event.
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Track(buf) => self.track(buf),
            EngineEvent::Untrack(buf) => self.untrack(buf),
            EngineEvent::Edited(buf) => self.on_edit(buf),
            EngineEvent::Closed(buf) => self.on_buffer_closed(buf),
            EngineEvent::Resolve(buf, kind) => self.resolve(buf, kind),
            EngineEvent::TrackerFlipped(buf) => {
                if self.registry.contains(buf) {
                    self.scheduler.schedule(buf, Duration::ZERO);
                }
            }
            EngineEvent::DebounceFired => {
                for buf in self.scheduler.drain() {
                    self.rescan(buf);
                }
            }
        }
    }

    /// Drain every event currently queued, without waiting.
    pub fn pump(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
        }
    }

    /// Run the engine loop, processing events as they arrive. Intended to
    /// be raced against a shutdown signal by the embedder.
    pub async fn run(&mut self) {
        while let Some(event) = self.rx.recv().await {
            self.handle_event(event);
        }
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// Re-parse `buf` and rebuild its cached classification and position
    /// data from the current text and tracker state.
    fn rescan(&mut self, buf: BufferId) {
        if !self.host.is_valid(buf) {
            // Stale reference: the buffer went away between scheduling and
            // reconciliation. Drop the entry and abandon the scan.
            self.on_buffer_closed(buf);
            return;
        }
        let Some(cache) = self.registry.get_mut(buf) else {
            return;
        };

        if !cache.is_enabled(buf) {
            cache.clear_scan();
            debug!(%buf, "all trackers disabled, scan state cleared");
        } else if let Some(lines) = self.host.lines(buf) {
            let regions = parse_regions(&lines, &self.matchers);
            debug!(%buf, regions = regions.len(), "reconciled buffer");
            cache.apply_scan(&regions);
        }

        // Even an empty result must erase stale highlights from the
        // previous state.
        cache.needs_clear = true;
        self.host.request_repaint(buf);
    }
}
