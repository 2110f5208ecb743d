//! Error types for the process supervisor.

use thiserror::Error;

use crate::ipc::IpcError;
use crate::watcher::WatchError;

/// Errors from supervisor operations.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to spawn '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("Failed to terminate child: {reason}")]
    Terminate { reason: String },

    #[error("Failed to wait for child: {reason}")]
    Wait { reason: String },

    #[error("No launcher configured")]
    MissingLauncher,

    #[error(transparent)]
    Ipc(#[from] IpcError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}
