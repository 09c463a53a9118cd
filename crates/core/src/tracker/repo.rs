//! Repository tracker: watches a git working tree for in-progress
//! merge-family operations and tests whether the buffer's file is among the
//! unmerged paths.
//!
//! Attach resolves the buffer's real path, locates the repository control
//! directory, and installs a non-recursive filesystem watch scoped to the
//! merge lifecycle files. Watch events debounce into a re-query of the
//! unmerged path list; the cached enabled flag is updated only when the
//! answer changes, and a change requests an immediate re-scan through the
//! engine's event queue. Every failure along the way silently leaves the
//! buffer untracked until the next natural trigger.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::EngineHandle;
use crate::git::GitClient;
use crate::host::BufferId;

use super::Tracker;

/// Control-directory files whose appearance marks an in-progress
/// merge-family operation.
pub const LIFECYCLE_FILES: &[&str] = &[
    "MERGE_HEAD",
    "REBASE_HEAD",
    "AUTO_MERGE",
    "CHERRY_PICK_HEAD",
    "BISECT_HEAD",
    "REVERT_HEAD",
];

type FlagMap = Arc<Mutex<HashMap<BufferId, bool>>>;

/// Live watcher resources for one attached buffer.
struct RepoWatch {
    _watcher: RecommendedWatcher,
    requery: JoinHandle<()>,
}

/// Tracker variant backed by repository state.
pub struct RepoTracker {
    git: GitClient,
    requery_delay: Duration,
    handle: EngineHandle,
    flags: FlagMap,
    watches: Arc<Mutex<HashMap<BufferId, RepoWatch>>>,
}

impl RepoTracker {
    pub fn new(git: GitClient, requery_delay: Duration, handle: EngineHandle) -> Self {
        Self {
            git,
            requery_delay,
            handle,
            flags: Arc::default(),
            watches: Arc::default(),
        }
    }
}

impl Tracker for RepoTracker {
    fn attach(&mut self, buf: BufferId, path: Option<&Path>) {
        let Some(path) = path else {
            debug!(%buf, "buffer has no backing file, repo tracking skipped");
            return;
        };
        let Ok(real_path) = std::fs::canonicalize(path) else {
            debug!(%buf, path = %path.display(), "path does not resolve, repo tracking skipped");
            return;
        };

        // Present until detach; the setup task and re-query loop treat a
        // missing entry as "tracking was disabled, discard the result".
        self.flags.lock().unwrap().insert(buf, false);

        let git = self.git.clone();
        let delay = self.requery_delay;
        let handle = self.handle.clone();
        let flags = self.flags.clone();
        let watches = self.watches.clone();

        tokio::spawn(async move {
            let Some(dir) = real_path.parent().map(Path::to_path_buf) else {
                return;
            };
            let Some(git_dir) = git.resolve_git_dir(&dir).await else {
                debug!(%buf, "not a repository, repo tracking disabled");
                return;
            };

            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let mut watcher = match notify::recommended_watcher(
                move |res: Result<Event, notify::Error>| match res {
                    Ok(event) if is_lifecycle_event(&event) => {
                        let _ = event_tx.send(());
                    }
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "watch error"),
                },
            ) {
                Ok(w) => w,
                Err(e) => {
                    debug!(%buf, error = %e, "failed to create filesystem watcher");
                    return;
                }
            };
            if let Err(e) = watcher.watch(&git_dir, RecursiveMode::NonRecursive) {
                debug!(%buf, git_dir = %git_dir.display(), error = %e, "failed to watch control directory");
                return;
            }

            let requery = tokio::spawn(requery_loop(
                event_rx,
                git.clone(),
                buf,
                real_path.clone(),
                flags.clone(),
                handle.clone(),
                delay,
            ));

            watches.lock().unwrap().insert(
                buf,
                RepoWatch {
                    _watcher: watcher,
                    requery,
                },
            );
            let still_attached = flags.lock().unwrap().contains_key(&buf);
            if !still_attached {
                // Detached while we were setting up.
                if let Some(watch) = watches.lock().unwrap().remove(&buf) {
                    watch.requery.abort();
                }
                return;
            }
            debug!(%buf, git_dir = %git_dir.display(), "repo tracker attached");

            refresh_flag(&git, buf, &real_path, &flags, &handle).await;
        });
    }

    fn detach(&mut self, buf: BufferId) {
        self.flags.lock().unwrap().remove(&buf);
        if let Some(watch) = self.watches.lock().unwrap().remove(&buf) {
            watch.requery.abort();
            debug!(%buf, "repo tracker detached");
        }
    }

    fn is_enabled(&self, buf: BufferId) -> bool {
        self.flags
            .lock()
            .unwrap()
            .get(&buf)
            .copied()
            .unwrap_or(false)
    }
}

/// Whether a filesystem event is a create or change of a lifecycle file.
fn is_lifecycle_event(event: &Event) -> bool {
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return false;
    }
    event.paths.iter().any(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .map(|n| LIFECYCLE_FILES.contains(&n))
            .unwrap_or(false)
    })
}

/// Debounce lifecycle-file events into unmerged-path re-queries. Runs until
/// detach aborts the task or the watcher is dropped.
async fn requery_loop(
    mut events: UnboundedReceiver<()>,
    git: GitClient,
    buf: BufferId,
    real_path: PathBuf,
    flags: FlagMap,
    handle: EngineHandle,
    delay: Duration,
) {
    while events.recv().await.is_some() {
        // Absorb the burst: wait until the events go quiet for `delay`.
        loop {
            match tokio::time::timeout(delay, events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }
        refresh_flag(&git, buf, &real_path, &flags, &handle).await;
    }
}

/// Re-query the unmerged path list and update the cached flag, emitting a
/// re-scan request only when the answer changed.
async fn refresh_flag(
    git: &GitClient,
    buf: BufferId,
    real_path: &Path,
    flags: &FlagMap,
    handle: &EngineHandle,
) {
    let Some(dir) = real_path.parent() else {
        return;
    };
    let unmerged = git.unmerged_paths(dir).await;
    let in_conflict = unmerged.iter().any(|p| {
        p.canonicalize()
            .map(|c| c.as_path() == real_path)
            .unwrap_or_else(|_| p.as_path() == real_path)
    });

    let flipped = {
        let mut flags = flags.lock().unwrap();
        match flags.get_mut(&buf) {
            Some(slot) => {
                let prev = *slot;
                *slot = in_conflict;
                prev != in_conflict
            }
            // Detached while the query ran; discard the result.
            None => false,
        }
    };
    if flipped {
        debug!(%buf, in_conflict, "repository conflict state changed");
        handle.tracker_flipped(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;

    #[tokio::test]
    async fn test_pathless_buffer_never_enabled() {
        let (handle, _rx) = events::channel();
        let mut tracker = RepoTracker::new(GitClient::default(), Duration::from_millis(10), handle);
        let buf = BufferId(1);

        tracker.attach(buf, None);
        assert!(!tracker.is_enabled(buf));
        tracker.detach(buf);
        tracker.detach(buf);
    }

    #[tokio::test]
    async fn test_unresolvable_path_skipped() {
        let (handle, _rx) = events::channel();
        let mut tracker = RepoTracker::new(GitClient::default(), Duration::from_millis(10), handle);
        let buf = BufferId(1);

        tracker.attach(buf, Some(Path::new("/nonexistent/dir/file.txt")));
        assert!(!tracker.is_enabled(buf));
    }

    #[tokio::test]
    async fn test_non_repository_stays_disabled() {
        let (handle, _rx) = events::channel();
        let mut tracker = RepoTracker::new(GitClient::default(), Duration::from_millis(10), handle);
        let buf = BufferId(1);

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "no repo here\n").unwrap();

        tracker.attach(buf, Some(&file));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!tracker.is_enabled(buf));
        tracker.detach(buf);
    }

    #[test]
    fn test_lifecycle_event_filter() {
        let create = Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![PathBuf::from("/repo/.git/MERGE_HEAD")],
            attrs: Default::default(),
        };
        assert!(is_lifecycle_event(&create));

        let unrelated = Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![PathBuf::from("/repo/.git/index.lock")],
            attrs: Default::default(),
        };
        assert!(!is_lifecycle_event(&unrelated));

        let removal = Event {
            kind: EventKind::Remove(notify::event::RemoveKind::File),
            paths: vec![PathBuf::from("/repo/.git/MERGE_HEAD")],
            attrs: Default::default(),
        };
        assert!(!is_lifecycle_event(&removal));
    }
}
