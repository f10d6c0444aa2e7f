//! Replication of the version store to a remote host over SFTP.
//!
//! Remote layout mirrors the local store exactly:
//! `<remote base>/<project>/<version id>/...`. There is no remote metadata
//! file; listings are derived from directory names.
//!
//! The client talks to the remote side through [`RemoteFs`], opened per
//! operation by a [`Connector`]. The production connector is
//! [`session::SftpConnector`].

pub mod client;
pub mod session;

pub use client::{RemoteOutcome, RemoteSyncClient, TransferSummary};
pub use session::{SftpConnector, SftpSession};

use crate::utils::Result;
use std::path::Path;

/// One entry of a remote directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// File operations on an open remote session. Paths are `/`-separated.
pub trait RemoteFs {
    /// Metadata for `path`, or `None` when it does not exist.
    fn stat(&self, path: &str) -> Result<Option<RemoteEntry>>;

    /// Direct children of `path`, without `.` and `..`.
    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Create `path` and any missing parents.
    fn mkdir_all(&self, path: &str) -> Result<()>;

    /// Copy a local file to `remote`, replacing it. Returns bytes written.
    fn upload_file(&self, local: &Path, remote: &str) -> Result<u64>;

    /// Copy `remote` to a local file, replacing it. Returns bytes written.
    fn download_file(&self, remote: &str, local: &Path) -> Result<u64>;
}

/// Opens a fresh remote session. The session is closed when dropped.
pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn RemoteFs>>;
}

/// Join remote path segments with `/`.
pub fn remote_join(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if base.is_empty() {
        format!("/{name}")
    } else {
        format!("{base}/{name}")
    }
}
