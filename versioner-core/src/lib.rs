//! Project Versioner core library
//!
//! Local file snapshots with a bounded version catalog, restore, mirroring to
//! a backup folder and replication to a remote host over SFTP.

pub mod catalog;
pub mod config;
pub mod fs;
pub mod mirror;
pub mod remote;
pub mod restore;
pub mod snapshot;
pub mod transfer;
pub mod utils;
pub mod workspace;

// Re-export commonly used types
pub use catalog::{VersionCatalog, VersionKind, VersionRecord};
pub use config::{ProjectConfig, RemoteProfile, SettingsSource, SnapshotMode};
pub use restore::RestoreEngine;
pub use snapshot::{SnapshotEngine, SnapshotScope};
pub use transfer::progress::ProgressSink;
pub use utils::errors::VersionerError;
pub type Result<T> = std::result::Result<T, VersionerError>;
