pub mod cli;
pub mod config;
pub mod ipc;
pub mod loader;
pub mod logging;
pub mod supervisor;
pub mod watcher;

pub use config::{CrashPolicy, Settings};
pub use ipc::{DependencyMessage, DependencyReporter, classify};
pub use loader::{ExecutionContext, LoadError, LoadMode, LoadOutcome, ModuleSystem, Resolver};
pub use supervisor::{Supervisor, SupervisorHandle, SupervisorState};
pub use watcher::{Debouncer, DependencySet};
