//! Copying a snapshot back onto the live workspace.
//!
//! Restores overwrite in place and never delete: files that exist in the
//! workspace but not in the snapshot are left alone. There is no rollback, so
//! callers confirm with the user first.

use crate::catalog::VersionCatalog;
use crate::fs::{copy_tree_filtered, CopyStats};
use crate::transfer::progress::{NoopProgress, ProgressSink};
use crate::utils::{Result, VersionerError};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Copy `snapshot_dir` over `workspace_root`, skipping any entry named
/// `store_name` so the version store is never touched.
pub fn restore(snapshot_dir: &Path, workspace_root: &Path, store_name: &str) -> Result<CopyStats> {
    if !snapshot_dir.is_dir() {
        return Err(VersionerError::VersionNotFound(snapshot_dir.display().to_string()));
    }

    let store_name = Path::new(store_name)
        .file_name()
        .unwrap_or_else(|| OsStr::new(store_name))
        .to_os_string();

    copy_tree_filtered(snapshot_dir, workspace_root, |path| {
        path.file_name() == Some(store_name.as_os_str())
    })
}

pub struct RestoreEngine {
    progress: Arc<dyn ProgressSink>,
}

impl Default for RestoreEngine {
    fn default() -> Self {
        Self::new(Arc::new(NoopProgress))
    }
}

impl RestoreEngine {
    pub fn new(progress: Arc<dyn ProgressSink>) -> Self {
        Self { progress }
    }

    /// Restore the catalogued version `id` onto `workspace_root`.
    pub fn restore_version(
        &self,
        catalog: &VersionCatalog,
        id: &str,
        workspace_root: &Path,
    ) -> Result<CopyStats> {
        let record = catalog
            .find(id)
            .ok_or_else(|| VersionerError::VersionNotFound(id.to_string()))?;
        let snapshot_dir = catalog
            .storage_dir(&record)
            .filter(|dir| dir.is_dir())
            .ok_or_else(|| VersionerError::VersionNotFound(id.to_string()))?;

        let store_name = catalog
            .versions_dir()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        self.progress.report(0, "Restoring files...");
        let stats = restore(&snapshot_dir, workspace_root, &store_name)?;
        self.progress.report(100, "Restore completed");

        info!(
            version_id = %id,
            files = stats.files,
            bytes = stats.bytes,
            "Version restored"
        );

        Ok(stats)
    }
}
