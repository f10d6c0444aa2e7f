//! Custom error types for the versioning engine.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VersionerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to {action} {}: {source}", path.display())]
    Fs {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Version not found: {0}")]
    VersionNotFound(String),
}

impl VersionerError {
    /// Wrap an I/O error with the operation and path it failed on.
    pub fn fs(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Fs {
            action,
            path: path.into(),
            source,
        }
    }

    /// True for failures to reach or authenticate against the remote host.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Authentication(_))
    }
}

pub type Result<T> = std::result::Result<T, VersionerError>;
