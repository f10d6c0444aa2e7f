//! The version catalog: `versions.json` inside the version store.
//!
//! The catalog is a JSON array of [`VersionRecord`]s kept newest first. Every
//! mutation is a full read-modify-write of the document. A missing or
//! unparseable file is treated as an empty catalog so that a damaged catalog
//! never blocks new snapshots.

pub mod record;

pub use record::{
    default_description, is_version_id, parse_version_id, version_id, VersionKind, VersionRecord,
    VERSION_PREFIX,
};

use crate::fs::walker::calculate_total_size;
use crate::utils::{Result, VersionerError};
use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the catalog inside the version store
pub const CATALOG_FILE: &str = "versions.json";

/// Handle on one project's version store directory
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    versions_dir: PathBuf,
}

impl VersionCatalog {
    pub fn new(versions_dir: impl Into<PathBuf>) -> Self {
        Self {
            versions_dir: versions_dir.into(),
        }
    }

    pub fn versions_dir(&self) -> &Path {
        &self.versions_dir
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.versions_dir.join(CATALOG_FILE)
    }

    /// All records, newest first. Never fails.
    pub fn list(&self) -> Vec<VersionRecord> {
        self.load()
    }

    pub fn find(&self, id: &str) -> Option<VersionRecord> {
        self.load().into_iter().find(|r| r.id == id)
    }

    /// Add a record, replacing any existing record with the same id.
    pub fn append(&self, record: VersionRecord) -> Result<()> {
        let mut records = self.load();
        records.retain(|r| r.id != record.id);
        records.push(record);
        sort_newest_first(&mut records);
        self.save(&records)
    }

    /// Drop every record past the first `max_versions` along with its
    /// directory. Returns the evicted records.
    ///
    /// The catalog is rewritten before any directory is removed, so no live
    /// record ever points at a deleted directory. Directory removal is
    /// best-effort.
    pub fn evict(&self, max_versions: usize) -> Result<Vec<VersionRecord>> {
        let mut records = self.load();
        if records.len() <= max_versions {
            return Ok(Vec::new());
        }

        let evicted = records.split_off(max_versions);
        self.save(&records)?;

        for record in &evicted {
            let Some(dir) = self.storage_dir(record) else {
                warn!(
                    version_id = %record.id,
                    path = %record.storage_path.display(),
                    "Refusing to delete a version directory outside the version store"
                );
                continue;
            };

            if !dir.exists() {
                continue;
            }

            match fs::remove_dir_all(&dir) {
                Ok(()) => info!(version_id = %record.id, "Removed old version"),
                Err(e) => warn!(
                    version_id = %record.id,
                    path = %dir.display(),
                    error = %e,
                    "Failed to remove old version directory"
                ),
            }
        }

        Ok(evicted)
    }

    /// Best-effort recursive byte total of `path`; 0 if it does not exist.
    pub fn folder_size(path: &Path) -> u64 {
        calculate_total_size(path)
    }

    /// Directory holding a record's files.
    ///
    /// Records whose stored path lies outside this store (for example a
    /// catalog pulled from another machine) resolve to `<store>/<id>`. A path
    /// with `..` segments counts as outside, whatever its prefix.
    /// Returns `None` when neither is usable.
    pub fn storage_dir(&self, record: &VersionRecord) -> Option<PathBuf> {
        let climbs = record.storage_path.components().any(|c| c == Component::ParentDir);
        if !climbs && record.storage_path.starts_with(&self.versions_dir) && record.storage_path != self.versions_dir {
            return Some(record.storage_path.clone());
        }
        is_version_id(&record.id).then(|| self.versions_dir.join(&record.id))
    }

    /// Create a record for a version directory that exists on disk but has no
    /// catalog entry, typically right after downloading it.
    ///
    /// Returns `Ok(None)` when the id is already catalogued.
    pub fn register_downloaded(&self, id: &str) -> Result<Option<VersionRecord>> {
        let (kind, _) = parse_version_id(id)
            .ok_or_else(|| VersionerError::Config(format!("Invalid version id: {id}")))?;

        let dir = self.versions_dir.join(id);
        if !dir.is_dir() {
            return Err(VersionerError::VersionNotFound(id.to_string()));
        }

        if self.find(id).is_some() {
            debug!(version_id = %id, "Version already catalogued");
            return Ok(None);
        }

        let included_folders = match kind {
            VersionKind::Full => None,
            VersionKind::Selective => Some(top_level_dirs(&dir)?),
        };

        let record = VersionRecord {
            id: id.to_string(),
            created_at: record::timestamp_from_id(id).unwrap_or_else(Utc::now),
            description: "Downloaded from remote server".to_string(),
            storage_path: dir.clone(),
            size_bytes: Self::folder_size(&dir),
            kind,
            included_folders,
        };

        self.append(record.clone())?;
        info!(version_id = %id, "Registered downloaded version in catalog");

        Ok(Some(record))
    }

    fn load(&self) -> Vec<VersionRecord> {
        let path = self.catalog_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read version catalog, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<VersionRecord>>(&content) {
            Ok(mut records) => {
                sort_newest_first(&mut records);
                records
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Version catalog is corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    fn save(&self, records: &[VersionRecord]) -> Result<()> {
        let content = serde_json::to_string_pretty(records)?;
        fs::create_dir_all(&self.versions_dir)
            .map_err(|e| VersionerError::fs("create directory", &self.versions_dir, e))?;
        atomic_write(&self.catalog_path(), content.as_bytes())
    }
}

fn sort_newest_first(records: &mut [VersionRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn top_level_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map_err(|e| VersionerError::fs("read", dir, e))?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    Ok(names)
}

/// Write content to a file atomically via temp file + rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_path = parent.join(format!(".{}.tmp-{}", CATALOG_FILE, std::process::id()));

    let write_result = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()
    })();

    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(VersionerError::fs("write", &temp_path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        VersionerError::fs("replace", path, e)
    })
}
