//! Helpers that inspect or prepare the live workspace around the engines.

use crate::config::CONFIG_FILE;
use crate::utils::{Result, VersionerError};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// Contents of the ignore marker written into every version store
pub const STORE_GITIGNORE: &str = "*\n!.gitignore\n";

/// Top-level names that never count as project content
const INFRASTRUCTURE_ENTRIES: &[&str] = &[
    CONFIG_FILE,
    ".git",
    ".svn",
    ".hg",
    ".vscode",
    ".idea",
    "node_modules",
    ".DS_Store",
    "Thumbs.db",
];

/// Workspaces with at most this many real entries count as empty
const EMPTY_THRESHOLD: usize = 2;

fn is_boilerplate_doc(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    ["LICENSE", "LICENCE", "README", "COPYING"]
        .iter()
        .any(|prefix| upper == *prefix || upper.starts_with(&format!("{prefix}.")))
}

fn is_infrastructure(name: &str, versions_path: &str) -> bool {
    if name == versions_path || INFRASTRUCTURE_ENTRIES.contains(&name) || is_boilerplate_doc(name) {
        return true;
    }
    name.starts_with('.') && !name.starts_with(".env")
}

/// Heuristic emptiness check used to offer an automatic restore.
///
/// Tooling directories, the version store, boilerplate docs and dotfiles
/// (other than `.env*`) are ignored; the workspace is empty when two or fewer
/// entries remain. A missing root counts as empty.
pub fn is_workspace_effectively_empty(root: &Path, versions_path: &str) -> Result<bool> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(VersionerError::fs("read", root, e)),
    };

    let mut real = 0;
    for entry in entries {
        let entry = entry.map_err(|e| VersionerError::fs("read", root, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_infrastructure(&name, versions_path) {
            real += 1;
        }
    }

    debug!(root = %root.display(), real_entries = real, "Checked workspace contents");
    Ok(real <= EMPTY_THRESHOLD)
}

/// Create the version store and its ignore marker if missing.
pub fn init_versions_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| VersionerError::fs("create directory", dir, e))?;

    let marker = dir.join(".gitignore");
    if !marker.exists() {
        fs::write(&marker, STORE_GITIGNORE).map_err(|e| VersionerError::fs("write", &marker, e))?;
        info!(path = %dir.display(), "Initialized version store");
    }

    Ok(())
}

/// Keep only the names that exist as directories under `root`.
pub fn validate_selected_folders(root: &Path, folders: &[String]) -> Vec<String> {
    folders
        .iter()
        .filter(|name| root.join(name).is_dir())
        .cloned()
        .collect()
}

/// Top-level directories offered for selective snapshots, sorted by name.
///
/// The version store and any name containing an exclusion pattern are left
/// out.
pub fn candidate_folders(root: &Path, patterns: &[String], versions_path: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for entry in fs::read_dir(root).map_err(|e| VersionerError::fs("read", root, e))? {
        let entry = entry.map_err(|e| VersionerError::fs("read", root, e))?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if name == versions_path || patterns.iter().any(|p| !p.is_empty() && name.contains(p.as_str())) {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Add the configuration file and version store to the project `.gitignore`.
///
/// Returns `false` when the entries were already registered.
pub fn register_in_gitignore(root: &Path, versions_path: &str) -> Result<bool> {
    let path = root.join(".gitignore");
    let mut content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(VersionerError::fs("read", &path, e)),
    };

    if content.lines().any(|line| line.trim() == CONFIG_FILE) {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&format!(
        "\n# Project Versioner\n{}\n{}/\n",
        CONFIG_FILE,
        versions_path.trim_end_matches('/')
    ));

    fs::write(&path, content).map_err(|e| VersionerError::fs("write", &path, e))?;
    Ok(true)
}
