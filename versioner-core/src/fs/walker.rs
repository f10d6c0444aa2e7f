//! Directory traversal for snapshot, restore and measurement.
//!
//! The walk is lazy and depth-first. Callers supply a pruning predicate; a
//! directory for which it returns `true` is skipped together with its whole
//! subtree, so excluded trees such as `node_modules` are never read.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Information about an entry discovered during walking
#[derive(Debug, Clone)]
pub struct TreeEntry {
    /// Full path to the entry
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,

    /// Is this a directory?
    pub is_dir: bool,

    /// File size in bytes (0 for directories)
    pub size: u64,

    /// Entry depth from root (direct children are depth 1)
    pub depth: usize,
}

impl TreeEntry {
    /// Create a TreeEntry from a DirEntry.
    /// Symlinks are resolved to their target; links to directories and broken
    /// links yield `None`.
    fn from_entry(entry: &DirEntry, root: &Path) -> io::Result<Option<Self>> {
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        let (is_dir, size) = if entry.path_is_symlink() {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_dir() => {
                    debug!("Skipping symlink to directory: {}", path.display());
                    return Ok(None);
                }
                Ok(resolved) => (false, resolved.len()),
                Err(_) => {
                    debug!("Skipping broken symlink: {}", path.display());
                    return Ok(None);
                }
            }
        } else {
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                (true, 0)
            } else {
                (false, metadata.len())
            }
        };

        Ok(Some(Self {
            path,
            relative_path,
            is_dir,
            size,
            depth: entry.depth(),
        }))
    }
}

/// Walk everything below `root` (the root itself is not yielded).
///
/// `prune` receives each candidate path before it is visited; returning
/// `true` drops the entry and, for directories, everything beneath it.
///
/// # Example
/// ```no_run
/// use versioner_core::fs::walker::walk_tree;
/// use std::path::Path;
///
/// let root = Path::new("/data");
/// let files = walk_tree(root, |p| p.ends_with("node_modules"))
///     .filter_map(Result::ok)
///     .filter(|e| !e.is_dir)
///     .count();
/// println!("Found {} files", files);
/// ```
pub fn walk_tree<'a, P>(root: &'a Path, mut prune: P) -> impl Iterator<Item = io::Result<TreeEntry>> + 'a
where
    P: FnMut(&Path) -> bool + 'a,
{
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| entry.depth() == 0 || !prune(entry.path()))
        .filter_map(move |entry| match entry {
            Ok(entry) => TreeEntry::from_entry(&entry, root).transpose(),
            // Keep walkdir's message, it names the failing path
            Err(e) => {
                let kind = e.io_error().map(|io| io.kind()).unwrap_or(io::ErrorKind::Other);
                Some(Err(io::Error::new(kind, e)))
            }
        })
}

/// Calculate the total size of all files under `root`.
///
/// Best-effort: a missing root yields 0 and entries that fail or disappear
/// mid-walk are skipped.
pub fn calculate_total_size(root: &Path) -> u64 {
    if !root.exists() {
        return 0;
    }

    walk_tree(root, |_| false)
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.is_dir)
        .map(|entry| entry.size)
        .sum()
}
