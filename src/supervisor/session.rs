//! One child process and everything attributed to it.
//!
//! A [`WatchSession`] is created per spawn and dropped on respawn. Its driver
//! task owns the child and the child's inbox, tagging everything it forwards
//! with the session generation. Once the session is terminated the inbox is
//! gone, so a dying child has nowhere left to deliver messages.

use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::launcher::{ChildProcess, ExitInfo};
use super::state::SupervisorEvent;
use crate::watcher::DependencySet;

/// Handle to the driver task of a live child.
struct ChildHandle {
    pid: Option<u32>,
    kill: oneshot::Sender<()>,
    driver: JoinHandle<()>,
}

pub(crate) struct WatchSession {
    generation: u64,
    dependencies: DependencySet,
    child: Option<ChildHandle>,
    exit: Option<ExitInfo>,
}

impl WatchSession {
    /// Take ownership of a freshly launched child and start driving it.
    pub(crate) fn start(
        generation: u64,
        child: Box<dyn ChildProcess>,
        inbox: UnboundedReceiver<Value>,
        events: UnboundedSender<SupervisorEvent>,
    ) -> Self {
        let pid = child.id();
        let (kill, kill_rx) = oneshot::channel();
        let driver = tokio::spawn(drive(generation, child, inbox, kill_rx, events));

        Self {
            generation,
            dependencies: DependencySet::new(),
            child: Some(ChildHandle { pid, kill, driver }),
            exit: None,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.pid)
    }

    pub(crate) fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    pub(crate) fn dependencies_mut(&mut self) -> &mut DependencySet {
        &mut self.dependencies
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.exit.is_none() && self.child.is_some()
    }

    /// Record that the child exited on its own.
    pub(crate) fn mark_exited(&mut self, exit: ExitInfo) {
        self.exit = Some(exit);
    }

    /// Kill the child (if still running) and wait until it is reaped.
    pub(crate) async fn terminate(mut self) {
        let Some(handle) = self.child.take() else {
            return;
        };

        // Fails only when the driver already finished
        let _ = handle.kill.send(());
        if let Err(e) = handle.driver.await {
            tracing::warn!(
                "[session] driver for generation {} ended abnormally: {e}",
                self.generation
            );
        }
        crate::debug_event!("session", "terminated", "generation {}", self.generation);
    }
}

/// Own the child until it exits or is told to die.
///
/// After the child exits the driver keeps forwarding its inbox until the
/// session is terminated. IPC readers can still be holding lines the child
/// wrote just before exiting.
async fn drive(
    generation: u64,
    mut child: Box<dyn ChildProcess>,
    mut inbox: UnboundedReceiver<Value>,
    mut kill: oneshot::Receiver<()>,
    events: UnboundedSender<SupervisorEvent>,
) {
    let forward = |payload: Value| {
        let _ = events.send(SupervisorEvent::Message { generation, payload });
    };

    let exit = loop {
        tokio::select! {
            biased;

            // A dropped sender means the session itself was dropped
            _ = &mut kill => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("[session] generation {generation}: {e}");
                }
                return;
            }

            Some(payload) = inbox.recv() => forward(payload),

            exit = child.wait() => break exit,
        }
    };

    // Already queued messages go out ahead of the exit
    while let Ok(payload) = inbox.try_recv() {
        forward(payload);
    }

    let exit = match exit {
        Ok(exit) => exit,
        Err(e) => {
            tracing::warn!("[session] generation {generation}: {e}");
            ExitInfo { code: None, success: false }
        }
    };
    let _ = events.send(SupervisorEvent::Exited { generation, exit });

    loop {
        tokio::select! {
            biased;

            _ = &mut kill => return,

            payload = inbox.recv() => match payload {
                Some(payload) => forward(payload),
                None => return,
            },
        }
    }
}
