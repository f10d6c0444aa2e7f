//! Recursive tree copies used by snapshot, restore and mirroring.
//!
//! Copies are not atomic: the first unreadable source entry or unwritable
//! destination aborts the operation and whatever was already copied stays on
//! disk.

use super::matcher::PathMatcher;
use super::walker::walk_tree;
use crate::utils::{Result, VersionerError};
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, warn};

/// Totals for a finished copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

impl CopyStats {
    fn merge(&mut self, other: CopyStats) {
        self.files += other.files;
        self.directories += other.directories;
        self.bytes += other.bytes;
    }
}

/// Copy everything under `source` into `destination`, skipping entries the
/// matcher excludes (evaluated relative to `source`).
pub fn copy_tree(source: &Path, destination: &Path, matcher: &PathMatcher) -> Result<CopyStats> {
    copy_tree_filtered(source, destination, |path| matcher.is_excluded(source, path))
}

/// Copy only the named top-level folders of `source`.
///
/// Each folder that exists as a directory is copied in full, with the
/// exclusion patterns evaluated relative to that folder. Names that are
/// missing, or that are themselves excluded, are skipped.
pub fn copy_selected_folders<S: AsRef<str>>(
    source: &Path,
    destination: &Path,
    folders: &[S],
    matcher: &PathMatcher,
) -> Result<CopyStats> {
    let mut stats = CopyStats::default();

    for folder in folders.iter().map(|f| f.as_ref()) {
        if !is_plain_name(folder) {
            warn!("Ignoring selected folder with a non top-level name: {}", folder);
            continue;
        }

        let src = source.join(folder);
        if !src.is_dir() {
            debug!("Selected folder not present, skipping: {}", src.display());
            continue;
        }
        if matcher.is_excluded(source, &src) {
            debug!("Selected folder matches an exclusion pattern, skipping: {}", folder);
            continue;
        }

        let dest = destination.join(folder);
        stats.merge(copy_tree(&src, &dest, matcher)?);
        stats.directories += 1;
    }

    Ok(stats)
}

/// Copy `source` into `destination` with an arbitrary pruning predicate.
///
/// Directories are created as needed (no error if they exist) and files are
/// overwritten byte-for-byte.
pub fn copy_tree_filtered<P>(source: &Path, destination: &Path, prune: P) -> Result<CopyStats>
where
    P: FnMut(&Path) -> bool,
{
    fs::create_dir_all(destination)
        .map_err(|e| VersionerError::fs("create directory", destination, e))?;

    let mut stats = CopyStats::default();

    for entry in walk_tree(source, prune) {
        let entry = entry.map_err(|e| VersionerError::fs("read", source, e))?;
        let target = destination.join(&entry.relative_path);

        if entry.is_dir {
            fs::create_dir_all(&target)
                .map_err(|e| VersionerError::fs("create directory", &target, e))?;
            stats.directories += 1;
        } else {
            let bytes = fs::copy(&entry.path, &target)
                .map_err(|e| VersionerError::fs("copy", &entry.path, e))?;
            stats.files += 1;
            stats.bytes += bytes;
        }
    }

    Ok(stats)
}

/// A single normal path component: no separators, no `..`.
fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
