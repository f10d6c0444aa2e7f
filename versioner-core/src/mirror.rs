//! Mirroring the version store into a second local folder (an external disk,
//! a synced drive).

use crate::fs::{copy_tree, CopyStats, PathMatcher};
use crate::utils::{Result, VersionerError};
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination of the mirror for `project_name` under `backup_root`.
pub fn mirror_destination(backup_root: &Path, project_name: &str) -> PathBuf {
    backup_root.join(format!("{project_name}-versions"))
}

/// Copy the whole store into `<backup_root>/<project_name>-versions`.
///
/// Existing files at the destination are overwritten; nothing is deleted.
pub fn sync_to_backup_folder(
    versions_dir: &Path,
    backup_root: &Path,
    project_name: &str,
) -> Result<CopyStats> {
    if !versions_dir.is_dir() {
        return Err(VersionerError::Config(format!(
            "No version store at {}",
            versions_dir.display()
        )));
    }

    let destination = mirror_destination(backup_root, project_name);
    let stats = copy_tree(versions_dir, &destination, &PathMatcher::empty())?;

    info!(
        destination = %destination.display(),
        files = stats.files,
        bytes = stats.bytes,
        "Mirrored version store"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_mirror_copies_store() -> Result<()> {
        let store = TempDir::new()?;
        let backup = TempDir::new()?;
        fs::create_dir_all(store.path().join("v_full_2024-01-01T00-00-00-000"))?;
        fs::write(store.path().join("v_full_2024-01-01T00-00-00-000/a.txt"), b"abc")?;
        fs::write(store.path().join("versions.json"), b"[]")?;

        let stats = sync_to_backup_folder(store.path(), &backup.path().join("nested"), "demo")?;

        let mirror = backup.path().join("nested/demo-versions");
        assert_eq!(stats.files, 2);
        assert_eq!(fs::read(mirror.join("v_full_2024-01-01T00-00-00-000/a.txt"))?, b"abc");
        assert!(mirror.join("versions.json").exists());

        Ok(())
    }

    #[test]
    fn test_mirror_requires_store() {
        let backup = TempDir::new().unwrap();
        let result = sync_to_backup_folder(Path::new("/nonexistent/store"), backup.path(), "demo");
        assert!(matches!(result, Err(VersionerError::Config(_))));
    }
}
