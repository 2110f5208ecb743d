//! Supervisor state machine and the events that drive it.

use std::fmt;
use std::path::PathBuf;

use serde_json::Value;

use super::launcher::ExitInfo;

/// Lifecycle of the supervisor.
///
/// ```text
/// Idle -> Starting -> Running -> Restarting -> Starting -> ...
///            |                      ^
///            +-> Idle (spawn failed)+ (qualifying change)
/// any -> Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Idle,
    Starting,
    Running,
    Restarting,
    Terminated,
}

impl SupervisorState {
    /// Whether the machine may move from `self` to `next`.
    pub fn can_transition_to(self, next: SupervisorState) -> bool {
        use SupervisorState::{Idle, Restarting, Running, Starting, Terminated};

        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Idle, Starting | Restarting) => true,
            (Starting, Running | Idle) => true,
            (Running, Restarting) => true,
            (Restarting, Starting) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Restarting => "restarting",
            SupervisorState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Observable summary published after every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorSnapshot {
    pub state: SupervisorState,
    /// Generation of the current session, 0 before the first spawn.
    pub generation: u64,
    /// Size of the current session's dependency set.
    pub dependency_count: usize,
    /// Whether the current session's child is still running.
    pub child_alive: bool,
}

/// Inputs to the supervisor's control loop.
#[derive(Debug)]
pub(crate) enum SupervisorEvent {
    /// A watched path changed on disk.
    FileChanged(PathBuf),
    /// Raw message from the child of session `generation`.
    Message { generation: u64, payload: Value },
    /// The child of session `generation` exited on its own.
    Exited { generation: u64, exit: ExitInfo },
    /// A debounced restart fired.
    RestartDue { ticket: u64 },
}
