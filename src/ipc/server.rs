//! Supervisor side of the IPC channel.
//!
//! One loopback listener per session. Every accepted connection is read as
//! newline-delimited JSON and each parsed value is pushed into the session's
//! inbox. The listener shuts down on its own once the inbox is dropped, which
//! happens when the session's child is terminated.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::IpcError;

/// A bound, not yet serving, IPC listener.
pub struct IpcServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl IpcServer {
    /// Bind to an ephemeral loopback port.
    pub async fn bind() -> Result<Self, IpcError> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| IpcError::Bind {
                reason: e.to_string(),
            })?;
        let addr = listener.local_addr().map_err(|e| IpcError::Bind {
            reason: e.to_string(),
        })?;

        Ok(Self { listener, addr })
    }

    /// Address children should connect to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start accepting connections, forwarding messages into `inbox`.
    pub fn serve(self, inbox: UnboundedSender<Value>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let IpcServer { listener, addr } = self;
            crate::debug_event!("ipc", "listening", "{addr}");

            loop {
                tokio::select! {
                    _ = inbox.closed() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            crate::debug_event!("ipc", "connected", "{peer}");
                            tokio::spawn(read_messages(stream, inbox.clone()));
                        }
                        Err(e) => {
                            tracing::warn!("[ipc] accept failed: {e}");
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    },
                }
            }

            crate::debug_event!("ipc", "closed", "{addr}");
        })
    }
}

/// Read NDJSON values from one connection until EOF or the inbox closes.
async fn read_messages(stream: TcpStream, inbox: UnboundedSender<Value>) {
    let mut lines = BufReader::new(stream).lines();

    loop {
        let line = tokio::select! {
            _ = inbox.closed() => return,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(line) {
                    Ok(value) => {
                        if inbox.send(value).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        crate::debug_event!("ipc", "ignored malformed line", "{e}");
                    }
                }
            }
            Ok(None) => return,
            Err(e) => {
                crate::debug_event!("ipc", "read failed", "{e}");
                return;
            }
        }
    }
}
