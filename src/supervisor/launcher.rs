//! Child process creation.
//!
//! [`Launcher`] is the seam between the supervisor's state machine and the
//! operating system. The production implementation is [`CommandLauncher`];
//! tests plug in scripted children.

use std::path::PathBuf;
use std::process::ExitStatus;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::UnboundedSender;

use super::error::SupervisorError;
use crate::ipc::{IPC_ENV, IpcServer};

/// How a child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl ExitInfo {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            success: true,
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            code: Some(code),
            success: false,
        }
    }
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}

/// Everything a launcher needs to start one session's child.
pub struct LaunchContext {
    /// Session generation the child belongs to.
    pub generation: u64,
    /// Inbox for raw messages from this child. Dropped by the supervisor
    /// when the session ends.
    pub inbox: UnboundedSender<Value>,
}

/// A running child owned by one session.
#[async_trait]
pub trait ChildProcess: Send {
    /// OS process id, if there is one.
    fn id(&self) -> Option<u32>;

    /// Wait for the child to exit.
    ///
    /// Must be cancel-safe: the session driver polls it inside `select!`.
    async fn wait(&mut self) -> Result<ExitInfo, SupervisorError>;

    /// Forcibly terminate the child and reap it.
    async fn kill(&mut self) -> Result<(), SupervisorError>;
}

/// Starts children.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// Start a child for the session described by `ctx`.
    async fn launch(&self, ctx: LaunchContext) -> Result<Box<dyn ChildProcess>, SupervisorError>;
}

/// Launches an external program with an IPC channel in its environment.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Append arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the child's working directory.
    pub fn cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl Launcher for CommandLauncher {
    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    async fn launch(&self, ctx: LaunchContext) -> Result<Box<dyn ChildProcess>, SupervisorError> {
        let server = IpcServer::bind().await?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(IPC_ENV, server.addr().to_string())
            .kill_on_drop(true);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let child = command.spawn().map_err(|e| SupervisorError::Spawn {
            program: self.program.clone(),
            reason: e.to_string(),
        })?;

        crate::debug_event!(
            "launcher",
            "spawned",
            "generation {} pid {:?} ipc {}",
            ctx.generation,
            child.id(),
            server.addr()
        );
        server.serve(ctx.inbox);

        Ok(Box::new(ProcessChild { child }))
    }
}

/// An OS process started by [`CommandLauncher`].
struct ProcessChild {
    child: Child,
}

#[async_trait]
impl ChildProcess for ProcessChild {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> Result<ExitInfo, SupervisorError> {
        self.child
            .wait()
            .await
            .map(ExitInfo::from)
            .map_err(|e| SupervisorError::Wait {
                reason: e.to_string(),
            })
    }

    async fn kill(&mut self) -> Result<(), SupervisorError> {
        self.child
            .kill()
            .await
            .map_err(|e| SupervisorError::Terminate {
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_describe() {
        let launcher = CommandLauncher::new("node").args(["--enable-source-maps", "app.js"]);
        assert_eq!(launcher.describe(), "node --enable-source-maps app.js");
        assert_eq!(CommandLauncher::new("deno").describe(), "deno");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let launcher = CommandLauncher::new("watchrun-definitely-not-a-real-program");
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = launcher
            .launch(LaunchContext {
                generation: 1,
                inbox: tx,
            })
            .await;

        assert!(matches!(result, Err(SupervisorError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_receives_ipc_address_and_exits() {
        let launcher = CommandLauncher::new("sh").args(["-c", "test -n \"$WATCHRUN_IPC\""]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut child = launcher
            .launch(LaunchContext {
                generation: 1,
                inbox: tx,
            })
            .await
            .unwrap();

        assert_eq!(child.wait().await.unwrap(), ExitInfo::success());
    }
}
