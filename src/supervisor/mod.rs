//! Watch-mode process supervisor.
//!
//! Keeps exactly one child alive, records the files it declares as
//! dependencies, and restarts it once a burst of changes to those files has
//! settled.
//!
//! # Architecture
//!
//! ```text
//!  notify thread ──FileChanged──┐
//!  session driver ──Message/Exited──┤
//!  debouncer ──RestartDue──────────┤
//!                                  v
//!                      Supervisor::run (single loop)
//!                         |            |
//!                   WatchSession   Reporter
//!              (child + DependencySet)
//! ```
//!
//! Every event coming from a child carries its session generation. Events
//! from a generation other than the current one are dropped, so a late
//! message from a dying child can never land in its successor's set.

mod error;
mod launcher;
mod reporter;
mod session;
mod state;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

pub use error::SupervisorError;
pub use launcher::{ChildProcess, CommandLauncher, ExitInfo, LaunchContext, Launcher};
pub use reporter::{CLEAR_SCREEN, Reporter};
pub use state::{SupervisorSnapshot, SupervisorState};

use session::WatchSession;
use state::SupervisorEvent;

use crate::config::{CrashPolicy, WatchConfig};
use crate::ipc;
use crate::watcher::{
    DEFAULT_DEBOUNCE_MS, Debouncer, DirectoryWatcher, FsWatcher, WatchError, normalize_path,
    watch_dir_for,
};

/// Owns the child, the dependency set and the restart timer.
pub struct Supervisor {
    launcher: Box<dyn Launcher>,
    watcher: Box<dyn DirectoryWatcher>,
    reporter: Reporter,
    debouncer: Debouncer,
    /// Base for relative dependency paths.
    cwd: PathBuf,
    /// Paths that qualify for a restart in every session.
    pinned: HashSet<PathBuf>,
    exclude: Vec<glob::Pattern>,
    crash_policy: CrashPolicy,
    state: SupervisorState,
    session: Option<WatchSession>,
    next_generation: u64,
    /// Identifies the most recently armed restart.
    restart_ticket: u64,
    events_tx: mpsc::UnboundedSender<SupervisorEvent>,
    events_rx: mpsc::UnboundedReceiver<SupervisorEvent>,
    snapshot: watch::Sender<SupervisorSnapshot>,
    shutdown: CancellationToken,
}

impl Supervisor {
    /// Create a builder for configuring the supervisor.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// Run until shutdown is requested.
    ///
    /// Spawns the first child immediately, then reacts to filesystem
    /// changes, child messages and debounced restarts one at a time.
    pub async fn run(mut self) {
        for path in self.pinned.clone() {
            self.watch_parent(&path);
        }

        crate::log_event!("supervisor", "started", "{}", self.launcher.describe());
        self.start().await;

        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event).await;
                }
            }
        }

        self.terminate().await;
    }

    async fn handle_event(&mut self, event: SupervisorEvent) {
        match event {
            SupervisorEvent::FileChanged(path) => self.on_file_changed(&path),
            SupervisorEvent::Message {
                generation,
                payload,
            } => self.on_message(generation, &payload),
            SupervisorEvent::Exited { generation, exit } => self.on_exit(generation, exit),
            SupervisorEvent::RestartDue { ticket } => {
                if ticket != self.restart_ticket {
                    crate::debug_event!("supervisor", "stale restart", "ticket {ticket}");
                    return;
                }
                self.restart().await;
            }
        }
    }

    fn on_file_changed(&mut self, path: &Path) {
        let path = normalize_path(path, &self.cwd);

        if self.exclude.iter().any(|pattern| pattern.matches_path(&path)) {
            crate::debug_event!("supervisor", "excluded", "{}", path.display());
            return;
        }

        if !self.qualifies(&path) {
            crate::debug_event!("supervisor", "ignored", "{}", path.display());
            return;
        }

        crate::log_event!("supervisor", "changed", "{}", path.display());
        self.arm_restart();
    }

    /// Whether a change to `path` should restart the current child.
    fn qualifies(&self, path: &Path) -> bool {
        self.pinned.contains(path)
            || self
                .session
                .as_ref()
                .is_some_and(|session| session.dependencies().contains(path))
    }

    fn on_message(&mut self, generation: u64, payload: &Value) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|session| session.generation() == generation)
        else {
            crate::debug_event!("supervisor", "stale message", "generation {generation}");
            return;
        };

        let Some(message) = ipc::classify(payload) else {
            crate::debug_event!("supervisor", "ignored message", "{payload}");
            return;
        };

        let path = message.to_path(&self.cwd);
        crate::debug_event!("supervisor", "dependency", "{}", path.display());
        let new_dir = session.dependencies_mut().insert(path);

        if let Some(dir) = new_dir {
            self.watch_dir(&dir);
        }
        self.publish();
    }

    fn on_exit(&mut self, generation: u64, exit: ExitInfo) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|session| session.generation() == generation)
        else {
            return;
        };
        session.mark_exited(exit);

        match exit.code {
            Some(code) => self.reporter.log(format!("process exited with code {code}")),
            None => self.reporter.log("process terminated by signal"),
        }

        if !exit.success && self.crash_policy == CrashPolicy::Restart {
            crate::log_event!("supervisor", "crashed", "restarting per crash policy");
            self.arm_restart();
        }
        self.publish();
    }

    /// Schedule a restart, superseding any that is still pending.
    fn arm_restart(&mut self) {
        self.restart_ticket += 1;
        let ticket = self.restart_ticket;
        let events = self.events_tx.clone();
        self.debouncer.schedule(move || {
            let _ = events.send(SupervisorEvent::RestartDue { ticket });
        });
    }

    async fn start(&mut self) {
        self.transition(SupervisorState::Starting);

        self.next_generation += 1;
        let generation = self.next_generation;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let launched = self
            .launcher
            .launch(LaunchContext {
                generation,
                inbox: inbox_tx,
            })
            .await;

        match launched {
            Ok(child) => {
                let session =
                    WatchSession::start(generation, child, inbox_rx, self.events_tx.clone());
                crate::debug_event!(
                    "supervisor",
                    "spawned",
                    "generation {generation} pid {:?}",
                    session.pid()
                );
                self.session = Some(session);
                self.transition(SupervisorState::Running);
            }
            Err(e) => {
                tracing::error!("[supervisor] {e}");
                self.reporter.error(format!("failed to start: {e}"));
                self.transition(SupervisorState::Idle);
            }
        }
        self.publish();
    }

    async fn restart(&mut self) {
        self.transition(SupervisorState::Restarting);

        if let Some(session) = self.session.take() {
            session.terminate().await;
        }
        self.publish();

        self.reporter.restarting();
        self.start().await;
    }

    async fn terminate(&mut self) {
        self.debouncer.cancel();
        if let Some(session) = self.session.take() {
            session.terminate().await;
        }
        self.transition(SupervisorState::Terminated);
        self.publish();
        crate::log_event!("supervisor", "terminated");
    }

    fn transition(&mut self, next: SupervisorState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!("[supervisor] invalid transition {} -> {next}", self.state);
            return;
        }
        crate::debug_event!("supervisor", "transition", "{} -> {next}", self.state);
        self.state = next;
    }

    fn publish(&self) {
        let (generation, dependency_count, child_alive) = match &self.session {
            Some(session) => (
                session.generation(),
                session.dependencies().len(),
                session.is_alive(),
            ),
            None => (self.next_generation, 0, false),
        };

        self.snapshot.send_replace(SupervisorSnapshot {
            state: self.state,
            generation,
            dependency_count,
            child_alive,
        });
    }

    fn watch_parent(&mut self, path: &Path) {
        self.watch_dir(&watch_dir_for(path));
    }

    fn watch_dir(&mut self, dir: &Path) {
        if let Err(e) = self.watcher.watch_dir(dir) {
            tracing::warn!("[supervisor] {e}");
        }
    }
}

/// Cheap clonable control surface for a running [`Supervisor`].
#[derive(Clone)]
pub struct SupervisorHandle {
    events: mpsc::UnboundedSender<SupervisorEvent>,
    snapshot: watch::Receiver<SupervisorSnapshot>,
    shutdown: CancellationToken,
}

impl SupervisorHandle {
    /// Feed a changed path into the supervisor, as the watcher would.
    pub fn file_changed(&self, path: impl Into<PathBuf>) {
        let _ = self.events.send(SupervisorEvent::FileChanged(path.into()));
    }

    /// Request termination.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SupervisorSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorSnapshot> {
        self.snapshot.clone()
    }
}

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    launcher: Option<Box<dyn Launcher>>,
    watcher: Option<Box<dyn DirectoryWatcher>>,
    reporter: Option<Reporter>,
    cwd: Option<PathBuf>,
    pinned: Vec<PathBuf>,
    exclude: Vec<String>,
    crash_policy: CrashPolicy,
    clear_screen: bool,
    debounce_ms: u64,
}

impl SupervisorBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            launcher: None,
            watcher: None,
            reporter: None,
            cwd: None,
            pinned: Vec::new(),
            exclude: Vec::new(),
            crash_policy: CrashPolicy::default(),
            clear_screen: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    /// Apply the `[watch]` configuration section.
    pub fn settings(mut self, config: &WatchConfig) -> Self {
        self.debounce_ms = config.debounce_ms;
        self.clear_screen = config.clear_screen;
        self.crash_policy = config.crash_policy;
        self.pinned.extend(config.include.iter().cloned());
        self.exclude.extend(config.exclude.iter().cloned());
        self
    }

    /// Set the launcher. Required.
    pub fn launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Some(Box::new(launcher));
        self
    }

    /// Replace the notify-backed directory watcher.
    pub fn watcher(mut self, watcher: impl DirectoryWatcher + 'static) -> Self {
        self.watcher = Some(Box::new(watcher));
        self
    }

    /// Replace the stdout reporter.
    pub fn reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Set the base directory for relative paths.
    pub fn cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Add a path that always qualifies for restart.
    pub fn pin(mut self, path: impl Into<PathBuf>) -> Self {
        self.pinned.push(path.into());
        self
    }

    /// Build the supervisor and its control handle.
    pub fn build(self) -> Result<(Supervisor, SupervisorHandle), SupervisorError> {
        let launcher = self.launcher.ok_or(SupervisorError::MissingLauncher)?;

        let cwd = match self.cwd {
            Some(cwd) => cwd,
            None => std::env::current_dir().map_err(|e| WatchError::InitFailed {
                reason: format!("cannot determine working directory: {e}"),
            })?,
        };

        let exclude = self
            .exclude
            .iter()
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|e| WatchError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let pinned = self
            .pinned
            .iter()
            .map(|path| normalize_path(path, &cwd))
            .collect();

        // Create channel for events
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let watcher: Box<dyn DirectoryWatcher> = match self.watcher {
            Some(watcher) => watcher,
            None => {
                let tx = events_tx.clone();
                Box::new(FsWatcher::new(move |path| {
                    let _ = tx.send(SupervisorEvent::FileChanged(path));
                })?)
            }
        };

        let reporter = self
            .reporter
            .unwrap_or_else(|| Reporter::stdout(self.clear_screen));

        let (snapshot, snapshot_rx) = watch::channel(SupervisorSnapshot::default());
        let shutdown = CancellationToken::new();

        let handle = SupervisorHandle {
            events: events_tx.clone(),
            snapshot: snapshot_rx,
            shutdown: shutdown.clone(),
        };

        let supervisor = Supervisor {
            launcher,
            watcher,
            reporter,
            debouncer: Debouncer::new(self.debounce_ms),
            cwd,
            pinned,
            exclude,
            crash_policy: self.crash_policy,
            state: SupervisorState::Idle,
            session: None,
            next_generation: 0,
            restart_ticket: 0,
            events_tx,
            events_rx,
            snapshot,
            shutdown,
        };

        Ok((supervisor, handle))
    }
}

impl Default for SupervisorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
