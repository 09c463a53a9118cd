//! Engine event queue.
//!
//! Everything that can happen to the engine — edit notifications, debounce
//! timer firings, tracker state flips, resolution requests — is an
//! [`EngineEvent`] drained sequentially by one owner. Timer tasks, watcher
//! callbacks, and subprocess continuations only ever send events, so all
//! cache and tracker mutation is serialized on the engine's loop.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::host::BufferId;
use crate::resolve::ResolutionKind;

/// One unit of work for the engine loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Begin tracking a buffer (manual opt-in).
    Track(BufferId),
    /// Stop tracking a buffer and destroy its cache entry.
    Untrack(BufferId),
    /// The buffer's text changed.
    Edited(BufferId),
    /// The buffer was closed by the host.
    Closed(BufferId),
    /// Apply a resolution at the buffer's cursor.
    Resolve(BufferId, ResolutionKind),
    /// The shared debounce timer fired; drain the pending set.
    DebounceFired,
    /// A tracker's enabled flag changed for this buffer.
    TrackerFlipped(BufferId),
}

/// Cloneable sender half of the engine's event queue.
///
/// Handed to watcher callbacks and subprocess tasks so their continuations
/// run on the engine loop. Sends after the engine has shut down are
/// silently dropped.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: UnboundedSender<EngineEvent>,
}

impl EngineHandle {
    pub fn send(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            debug!("engine event queue closed, event dropped");
        }
    }

    pub fn track(&self, buf: BufferId) {
        self.send(EngineEvent::Track(buf));
    }

    pub fn untrack(&self, buf: BufferId) {
        self.send(EngineEvent::Untrack(buf));
    }

    pub fn edited(&self, buf: BufferId) {
        self.send(EngineEvent::Edited(buf));
    }

    pub fn closed(&self, buf: BufferId) {
        self.send(EngineEvent::Closed(buf));
    }

    pub fn resolve(&self, buf: BufferId, kind: ResolutionKind) {
        self.send(EngineEvent::Resolve(buf, kind));
    }

    pub fn tracker_flipped(&self, buf: BufferId) {
        self.send(EngineEvent::TrackerFlipped(buf));
    }
}

/// Create the engine's event channel.
pub fn channel() -> (EngineHandle, UnboundedReceiver<EngineEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EngineHandle { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (handle, mut rx) = channel();
        handle.track(BufferId(1));
        handle.edited(BufferId(1));
        handle.send(EngineEvent::DebounceFired);

        assert_eq!(rx.recv().await, Some(EngineEvent::Track(BufferId(1))));
        assert_eq!(rx.recv().await, Some(EngineEvent::Edited(BufferId(1))));
        assert_eq!(rx.recv().await, Some(EngineEvent::DebounceFired));
    }

    #[tokio::test]
    async fn test_send_after_close_is_silent() {
        let (handle, rx) = channel();
        drop(rx);
        handle.edited(BufferId(1));
    }
}
