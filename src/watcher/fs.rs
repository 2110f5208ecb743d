//! Adapter over `notify::RecommendedWatcher`.
//!
//! Watches directories on demand and forwards every relevant changed path to
//! a callback. Access events and metadata-only modifications (mtime, chmod)
//! are dropped here so they never reach the supervisor.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};

use super::error::WatchError;

/// Something that can be asked to observe a directory.
///
/// The supervisor only needs this one capability; tests substitute a
/// recorder so no real filesystem watch is installed.
pub trait DirectoryWatcher: Send {
    /// Start watching `dir` (non-recursively). Watching twice is a no-op.
    fn watch_dir(&mut self, dir: &Path) -> Result<(), WatchError>;
}

/// Filesystem watcher backed by the platform's recommended notify backend.
pub struct FsWatcher {
    /// The underlying file watcher.
    inner: notify::RecommendedWatcher,
    /// Directories already registered with `inner`.
    watched: HashSet<PathBuf>,
}

impl FsWatcher {
    /// Create a watcher that calls `on_change` for each changed path.
    ///
    /// `on_change` runs on notify's event thread and must not block.
    pub fn new<F>(on_change: F) -> Result<Self, WatchError>
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        let inner = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_relevant(&event.kind) {
                    return;
                }
                for path in event.paths {
                    on_change(path);
                }
            }
            Err(e) => {
                tracing::error!("[watcher] file watch error: {e}");
            }
        })?;

        Ok(Self {
            inner,
            watched: HashSet::new(),
        })
    }
}

impl DirectoryWatcher for FsWatcher {
    fn watch_dir(&mut self, dir: &Path) -> Result<(), WatchError> {
        if self.watched.contains(dir) {
            return Ok(());
        }

        self.inner
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;

        crate::debug_event!("watcher", "watching", "{}", dir.display());
        self.watched.insert(dir.to_path_buf());
        Ok(())
    }
}

/// Whether an event kind can represent a content change.
pub fn is_relevant(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}
