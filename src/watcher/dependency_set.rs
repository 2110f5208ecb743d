//! Per-session dependency set with watch directory computation.
//!
//! Tracks the files the running child has declared it loaded, and the
//! parent directories that must be watched to see those files change.
//! Directories are watched instead of the files themselves so editors that
//! save by rename-over still produce events.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Paths declared by the currently running child.
///
/// Append-only for the lifetime of one session; the supervisor replaces it
/// with an empty set on every respawn.
#[derive(Debug, Default)]
pub struct DependencySet {
    /// Declared dependency paths, normalized.
    paths: HashSet<PathBuf>,
    /// Parent directories of tracked files.
    watch_dirs: HashSet<PathBuf>,
}

impl DependencySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a dependency path.
    ///
    /// Returns the parent directory if this is the first path seen in it,
    /// so the caller can start watching it. Duplicate paths are absorbed.
    pub fn insert(&mut self, path: PathBuf) -> Option<PathBuf> {
        let parent = watch_dir_for(&path);
        if !self.paths.insert(path) {
            return None;
        }

        if self.watch_dirs.insert(parent.clone()) {
            Some(parent)
        } else {
            None
        }
    }

    /// Check if a path is in the set.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Get count of tracked paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if no dependency has been declared yet.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Directory to watch in order to observe changes to `path`.
pub fn watch_dir_for(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Make `path` absolute against `base` and canonicalize it when it exists.
///
/// Paths that no longer exist (a deleted file) are normalized lexically so
/// removal events still compare equal to what was recorded.
pub fn normalize_path(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    joined
        .canonicalize()
        .unwrap_or_else(|_| normalize_lexically(&joined))
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
