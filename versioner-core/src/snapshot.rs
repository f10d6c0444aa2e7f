//! Snapshot creation.
//!
//! A snapshot is a physical copy of the workspace (or of some of its top-level
//! folders) under `<versions dir>/<version id>/`. Creation is strictly
//! sequential: copy, measure, append to the catalog, evict. Nothing is
//! catalogued unless the copy finished.

use crate::catalog::{default_description, version_id, VersionCatalog, VersionKind, VersionRecord};
use crate::config::ProjectConfig;
use crate::fs::{copy_selected_folders, copy_tree_filtered, CopyStats, PathMatcher};
use crate::transfer::progress::{NoopProgress, ProgressSink};
use crate::utils::{Result, VersionerError};
use crate::workspace::init_versions_dir;
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What a snapshot covers, decided before the engine is called
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotScope {
    Full,
    Selective(Vec<String>),
}

impl SnapshotScope {
    pub fn kind(&self) -> VersionKind {
        match self {
            SnapshotScope::Full => VersionKind::Full,
            SnapshotScope::Selective(_) => VersionKind::Selective,
        }
    }
}

/// Source of the instant embedded in new version ids
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct SnapshotEngine {
    progress: Arc<dyn ProgressSink>,
    clock: Arc<dyn Clock>,
}

impl Default for SnapshotEngine {
    fn default() -> Self {
        Self::new(Arc::new(NoopProgress))
    }
}

impl SnapshotEngine {
    pub fn new(progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            progress,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Capture `workspace_root` into a new version and catalog it.
    ///
    /// Reports progress 0, 70 and 30 (cumulative 100). On copy failure the
    /// partially written version directory is removed and nothing is
    /// catalogued.
    pub fn create_snapshot(
        &self,
        workspace_root: &Path,
        scope: &SnapshotScope,
        description: Option<&str>,
        config: &ProjectConfig,
    ) -> Result<VersionRecord> {
        let versions_dir = config.versions_dir(workspace_root);
        let catalog = VersionCatalog::new(&versions_dir);
        let matcher = PathMatcher::new(&config.exclude_patterns)?;

        let folders = match scope {
            SnapshotScope::Full => Vec::new(),
            SnapshotScope::Selective(folders) => {
                let folders: Vec<String> = folders
                    .iter()
                    .filter(|f| f.as_str() != config.versions_path)
                    .cloned()
                    .collect();
                if folders.is_empty() {
                    return Err(VersionerError::Config(
                        "A selective snapshot needs at least one folder".to_string(),
                    ));
                }
                folders
            }
        };

        init_versions_dir(&versions_dir)?;
        self.progress.report(0, "Copying files...");

        let kind = scope.kind();
        let (id, snapshot_dir) = self.allocate(&versions_dir, kind)?;
        info!(version_id = %id, "Creating snapshot");

        let copied = match scope {
            SnapshotScope::Full => copy_tree_filtered(workspace_root, &snapshot_dir, |path| {
                path == versions_dir.as_path() || matcher.is_excluded(workspace_root, path)
            }),
            SnapshotScope::Selective(_) => {
                copy_selected_folders(workspace_root, &snapshot_dir, &folders, &matcher)
            }
        };

        let stats: CopyStats = match copied {
            Ok(stats) => stats,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&snapshot_dir) {
                    warn!(
                        path = %snapshot_dir.display(),
                        error = %cleanup,
                        "Failed to remove incomplete snapshot"
                    );
                }
                return Err(e);
            }
        };

        self.progress.report(70, "Saving metadata...");

        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_description(kind, &folders));

        let record = VersionRecord {
            id: id.clone(),
            created_at: self.created_at(&id),
            description,
            size_bytes: VersionCatalog::folder_size(&snapshot_dir),
            storage_path: snapshot_dir,
            kind,
            included_folders: (kind == VersionKind::Selective).then_some(folders),
        };

        catalog.append(record.clone())?;
        let evicted = catalog.evict(config.max_versions.max(1))?;

        info!(
            version_id = %record.id,
            files = stats.files,
            bytes = record.size_bytes,
            evicted = evicted.len(),
            "Snapshot created"
        );

        self.progress.report(30, "Completed");
        Ok(record)
    }

    /// Pick a fresh id and create its directory, stepping the instant by one
    /// millisecond while the directory is taken.
    fn allocate(&self, versions_dir: &Path, kind: VersionKind) -> Result<(String, PathBuf)> {
        let mut at = self.clock.now();
        loop {
            let id = version_id(kind, at);
            let dir = versions_dir.join(&id);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((id, dir)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    at += Duration::milliseconds(1);
                }
                Err(e) => return Err(VersionerError::fs("create directory", &dir, e)),
            }
        }
    }

    fn created_at(&self, id: &str) -> DateTime<Utc> {
        crate::catalog::record::timestamp_from_id(id).unwrap_or_else(|| self.clock.now())
    }
}
