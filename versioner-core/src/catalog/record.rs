//! Snapshot metadata records and the version id scheme.
//!
//! Ids look like `v_full_2024-05-01T09-30-12-345`: the kind tag followed by a
//! UTC timestamp whose `:` and `.` were replaced with `-`. Every field is
//! zero-padded, so sorting ids lexically sorts them by time.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Every version directory name starts with this.
pub const VERSION_PREFIX: &str = "v_";

const ID_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3f";

/// Full project snapshot or a subset of top-level folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionKind {
    Full,
    Selective,
}

impl VersionKind {
    /// Tag used inside version ids.
    pub fn id_tag(&self) -> &'static str {
        match self {
            VersionKind::Full => "full",
            VersionKind::Selective => "partial",
        }
    }

    fn from_id_tag(tag: &str) -> Option<Self> {
        match tag {
            "full" => Some(VersionKind::Full),
            "partial" => Some(VersionKind::Selective),
            _ => None,
        }
    }
}

/// One entry of `versions.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub storage_path: PathBuf,
    pub size_bytes: u64,
    pub kind: VersionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_folders: Option<Vec<String>>,
}

/// Filesystem-safe rendering of an instant, e.g. `2024-05-01T09-30-12-345`.
pub fn sanitized_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3f")
        .to_string()
        .replace([':', '.'], "-")
}

/// Build the id for a snapshot of `kind` taken at `at`.
pub fn version_id(kind: VersionKind, at: DateTime<Utc>) -> String {
    format!("{}{}_{}", VERSION_PREFIX, kind.id_tag(), sanitized_timestamp(at))
}

/// Split a version id into its kind and timestamp part.
///
/// Returns `None` unless the id matches `v_(full|partial)_[0-9T-]+`.
pub fn parse_version_id(id: &str) -> Option<(VersionKind, &str)> {
    let rest = id.strip_prefix(VERSION_PREFIX)?;
    let (tag, timestamp) = rest.split_once('_')?;
    let kind = VersionKind::from_id_tag(tag)?;

    let valid = !timestamp.is_empty()
        && timestamp.chars().all(|c| c.is_ascii_digit() || c == 'T' || c == '-');

    valid.then_some((kind, timestamp))
}

pub fn is_version_id(id: &str) -> bool {
    parse_version_id(id).is_some()
}

/// Instant embedded in a version id, if it carries a full timestamp.
pub fn timestamp_from_id(id: &str) -> Option<DateTime<Utc>> {
    let (_, timestamp) = parse_version_id(id)?;
    NaiveDateTime::parse_from_str(timestamp, ID_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Description used when the caller supplied none.
pub fn default_description(kind: VersionKind, folders: &[String]) -> String {
    match kind {
        VersionKind::Full => "Full project snapshot".to_string(),
        VersionKind::Selective => format!("Snapshot of folders: {}", folders.join(", ")),
    }
}
