//! Child-to-supervisor messaging.
//!
//! The wire format is newline-delimited JSON over a loopback TCP connection
//! whose address is handed to the child in [`IPC_ENV`].

pub mod client;
pub mod message;
pub mod server;

use thiserror::Error;

pub use client::DependencyReporter;
pub use message::{ChildMessage, DependencyMessage, classify, classify_line};
pub use server::IpcServer;

/// Environment variable carrying the supervisor's IPC address.
pub const IPC_ENV: &str = "WATCHRUN_IPC";

/// Errors from the IPC channel.
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Failed to bind IPC listener: {reason}")]
    Bind { reason: String },

    #[error("Failed to connect to supervisor at {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("IPC write failed: {0}")]
    Io(#[from] std::io::Error),
}
