//! Filesystem side of the supervisor.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher (FsWatcher)
//!   - watches parent directories of declared dependencies
//!   - drops access / metadata noise
//!         |
//!    changed path
//!         v
//! Supervisor -- DependencySet (per session)
//!         |
//!     Debouncer (one armed timer)
//! ```

mod debouncer;
mod dependency_set;
mod error;
mod fs;

pub use debouncer::{DEFAULT_DEBOUNCE_MS, Debouncer};
pub use dependency_set::{DependencySet, normalize_lexically, normalize_path, watch_dir_for};
pub use error::WatchError;
pub use fs::{DirectoryWatcher, FsWatcher, is_relevant};
