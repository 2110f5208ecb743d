//! Child side of the IPC channel.
//!
//! A process started by the supervisor finds the channel address in the
//! [`IPC_ENV`] environment variable and reports each file it loads.

use std::io::Write;
use std::net::TcpStream;
use std::path::Path;

use super::message::{ChildMessage, DependencyMessage};
use super::{IPC_ENV, IpcError};

/// Blocking connection used by a child to declare dependencies.
///
/// Writes on a blocking std socket. From inside a tokio runtime, report
/// through `spawn_blocking`.
#[derive(Debug)]
pub struct DependencyReporter {
    stream: TcpStream,
}

impl DependencyReporter {
    /// Connect to a supervisor listening on `addr`.
    pub fn connect(addr: &str) -> Result<Self, IpcError> {
        let stream = TcpStream::connect(addr).map_err(|e| IpcError::Connect {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { stream })
    }

    /// Connect using the address in the environment.
    ///
    /// Returns `None` when the process is not running under a supervisor.
    pub fn from_env() -> Option<Result<Self, IpcError>> {
        let addr = std::env::var(IPC_ENV).ok()?;
        Some(Self::connect(&addr))
    }

    /// Declare that this process depends on `path`.
    pub fn report(&mut self, path: &Path) -> Result<(), IpcError> {
        let message = DependencyMessage::new(path.to_string_lossy());
        self.send(&message.into())
    }

    /// Send one message.
    pub fn send(&mut self, message: &ChildMessage) -> Result<(), IpcError> {
        let mut line = message.to_line();
        line.push('\n');
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    #[test]
    fn test_reporter_writes_dependency_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut reporter = DependencyReporter::connect(&addr).unwrap();
        reporter.report(Path::new("/project/src/a.ts")).unwrap();
        reporter.send(&ChildMessage::Unknown).unwrap();

        let (stream, _) = listener.accept().unwrap();
        let mut lines = BufReader::new(stream).lines();
        assert_eq!(
            lines.next().unwrap().unwrap(),
            r#"{"kind":"dependency","path":"/project/src/a.ts"}"#
        );
        assert_eq!(lines.next().unwrap().unwrap(), r#"{"kind":"unknown"}"#);
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let err = DependencyReporter::connect("127.0.0.1:1").unwrap_err();
        assert!(matches!(err, IpcError::Connect { .. }));
    }
}
