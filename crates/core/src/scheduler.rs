//! Debounced, coalescing update scheduler.
//!
//! Buffers needing a re-scan accumulate in a pending set paired with one
//! shared single-shot timer. Re-arming discards the previous un-fired timer,
//! so only the most recent delay takes effect, but every buffer requested
//! during the window is still reconciled exactly once when the timer fires.
//! A zero delay still defers through the event queue: edit-handling code
//! never recurses into reconciliation.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

use crate::events::{EngineEvent, EngineHandle};
use crate::host::BufferId;

/// The pending-update set plus its shared debounce timer.
pub struct UpdateScheduler {
    pending: BTreeSet<BufferId>,
    timer: Option<JoinHandle<()>>,
    handle: EngineHandle,
}

impl UpdateScheduler {
    pub fn new(handle: EngineHandle) -> Self {
        Self {
            pending: BTreeSet::new(),
            timer: None,
            handle,
        }
    }

    /// Queue `buf` for reconciliation after `delay`, restarting the shared
    /// timer. Must be called from within a tokio runtime.
    pub fn schedule(&mut self, buf: BufferId, delay: Duration) {
        self.pending.insert(buf);
        trace!(%buf, delay_ms = delay.as_millis() as u64, pending = self.pending.len(), "scheduled update");

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let handle = self.handle.clone();
        self.timer = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            handle.send(EngineEvent::DebounceFired);
        }));
    }

    /// Atomically take every pending buffer, clearing the set. Called by the
    /// engine when the timer fires; no new schedule call can interleave
    /// because both run on the engine loop.
    pub fn drain(&mut self) -> Vec<BufferId> {
        self.timer = None;
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Drop a buffer from the pending set without reconciling it.
    pub fn forget(&mut self, buf: BufferId) {
        self.pending.remove(&buf);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;

    #[tokio::test]
    async fn test_repeated_schedules_coalesce() {
        let (handle, mut rx) = events::channel();
        let mut scheduler = UpdateScheduler::new(handle);
        let buf = BufferId(1);

        scheduler.schedule(buf, Duration::from_millis(10));
        scheduler.schedule(buf, Duration::from_millis(10));
        scheduler.schedule(buf, Duration::from_millis(10));
        assert_eq!(scheduler.pending_count(), 1);

        // Only the last armed timer survives, so exactly one fire arrives.
        assert_eq!(rx.recv().await, Some(EngineEvent::DebounceFired));
        assert_eq!(scheduler.drain(), vec![buf]);
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_distinct_buffers_all_drained() {
        let (handle, mut rx) = events::channel();
        let mut scheduler = UpdateScheduler::new(handle);

        scheduler.schedule(BufferId(3), Duration::ZERO);
        scheduler.schedule(BufferId(1), Duration::ZERO);
        scheduler.schedule(BufferId(2), Duration::ZERO);

        assert_eq!(rx.recv().await, Some(EngineEvent::DebounceFired));
        assert_eq!(
            scheduler.drain(),
            vec![BufferId(1), BufferId(2), BufferId(3)]
        );
    }

    #[tokio::test]
    async fn test_zero_delay_still_defers() {
        let (handle, mut rx) = events::channel();
        let mut scheduler = UpdateScheduler::new(handle);

        scheduler.schedule(BufferId(1), Duration::ZERO);
        // Nothing reconciles synchronously; the fire arrives via the queue.
        assert!(rx.try_recv().is_err());
        assert_eq!(rx.recv().await, Some(EngineEvent::DebounceFired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_waits_for_full_window() {
        let (handle, mut rx) = events::channel();
        let mut scheduler = UpdateScheduler::new(handle);

        scheduler.schedule(BufferId(1), Duration::from_millis(50));
        // Let the timer task register its sleep before moving the clock.
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(49)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(rx.recv().await, Some(EngineEvent::DebounceFired));
    }

    #[tokio::test]
    async fn test_forget_removes_pending() {
        let (handle, _rx) = events::channel();
        let mut scheduler = UpdateScheduler::new(handle);

        scheduler.schedule(BufferId(1), Duration::from_millis(5));
        scheduler.schedule(BufferId(2), Duration::from_millis(5));
        scheduler.forget(BufferId(1));
        assert_eq!(scheduler.drain(), vec![BufferId(2)]);
    }
}
