//! Error types for module resolution.

use std::path::PathBuf;
use thiserror::Error;

use super::context::LoadMode;

/// Errors from resolving a load request.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot find module '{specifier}'")]
    ModuleNotFound { specifier: String, mode: LoadMode },

    #[error("Invalid package manifest {path}: {reason}")]
    InvalidPackageManifest { path: PathBuf, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Whether this is a resolution miss rather than a broken package.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::ModuleNotFound { .. })
    }
}
