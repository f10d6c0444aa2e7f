//! Progress reporting for snapshot and transfer operations.
//!
//! Engines report coarse percentage checkpoints through [`ProgressSink`].
//! Remote downloads additionally track bytes through [`DownloadProgress`],
//! which estimates transferred bytes from per-file completion events.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Receiver for percentage checkpoints.
///
/// `increment` is added to whatever was reported before; the increments of a
/// single operation sum to 100.
pub trait ProgressSink: Send + Sync {
    fn report(&self, increment: u32, message: &str);
}

/// Sink that discards every report
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _increment: u32, _message: &str) {}
}

/// Sink that keeps every report, for callers that inspect progress afterwards
#[derive(Debug, Default)]
pub struct RecordedProgress {
    reports: Mutex<Vec<(u32, String)>>,
}

impl RecordedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(u32, String)> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Sum of all increments seen so far.
    pub fn total(&self) -> u32 {
        self.reports().iter().map(|(inc, _)| inc).sum()
    }
}

impl ProgressSink for RecordedProgress {
    fn report(&self, increment: u32, message: &str) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((increment, message.to_string()));
        }
    }
}

/// Progress information for a file transfer operation
#[derive(Debug, Clone)]
pub struct TransferProgress {
    /// Total bytes to transfer
    pub total_bytes: u64,

    /// Bytes transferred so far (estimated, never above `total_bytes`)
    pub transferred_bytes: u64,

    /// Current transfer speed in bytes/second
    pub bytes_per_second: u64,

    /// Estimated time remaining (seconds)
    pub eta_seconds: u64,

    /// Percentage complete (0-100)
    pub percent_complete: f64,

    /// Number of files processed
    pub files_processed: usize,

    /// Total number of files
    pub total_files: usize,

    /// Last file that finished transferring
    pub current_file: Option<String>,
}

impl TransferProgress {
    pub fn new(total_bytes: u64, total_files: usize) -> Self {
        Self {
            total_bytes,
            transferred_bytes: 0,
            bytes_per_second: 0,
            eta_seconds: 0,
            percent_complete: 0.0,
            files_processed: 0,
            total_files,
            current_file: None,
        }
    }

    fn update(&mut self, transferred_bytes: u64) {
        self.transferred_bytes = transferred_bytes.min(self.total_bytes);
        self.percent_complete = if self.total_bytes > 0 {
            (self.transferred_bytes as f64 / self.total_bytes as f64) * 100.0
        } else {
            0.0
        };
    }

    pub fn is_complete(&self) -> bool {
        self.transferred_bytes >= self.total_bytes
    }
}

/// One remote file of a version, discovered before the transfer starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path relative to the version directory, `/`-separated
    pub relative_path: String,
    pub size: u64,
}

impl ManifestEntry {
    pub fn new(relative_path: impl Into<String>, size: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            size,
        }
    }

    /// Base name of the file.
    pub fn name(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Byte estimate for a download whose transport reports completions by file
/// name only.
///
/// A completed name is matched against the manifest entries not yet counted.
/// On a match the exact size is added and the entry is consumed; otherwise the
/// average file size is assumed. The running total is clamped to the manifest
/// total, so progress is monotonic and never overshoots.
pub struct DownloadProgress {
    pending: Vec<ManifestEntry>,
    average_size: u64,
    start_time: Instant,
    last_update_time: Instant,
    last_bytes: u64,
    progress: TransferProgress,
}

impl DownloadProgress {
    pub fn new(manifest: Vec<ManifestEntry>) -> Self {
        let total_bytes: u64 = manifest.iter().map(|e| e.size).sum();
        let total_files = manifest.len();
        let average_size = if total_files > 0 {
            total_bytes / total_files as u64
        } else {
            0
        };
        let now = Instant::now();

        Self {
            pending: manifest,
            average_size,
            start_time: now,
            last_update_time: now,
            last_bytes: 0,
            progress: TransferProgress::new(total_bytes, total_files),
        }
    }

    /// Account for one finished file and return the updated estimate.
    pub fn file_completed(&mut self, file_name: &str) -> &TransferProgress {
        let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

        let bytes = match self.pending.iter().position(|e| e.name() == base) {
            Some(index) => self.pending.swap_remove(index).size,
            None => self.average_size,
        };

        self.progress.files_processed += 1;
        self.progress.current_file = Some(file_name.to_string());
        self.advance(self.progress.transferred_bytes.saturating_add(bytes));

        &self.progress
    }

    fn advance(&mut self, transferred_bytes: u64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update_time).as_secs_f64();

        self.progress.update(transferred_bytes);
        let transferred_bytes = self.progress.transferred_bytes;

        if elapsed > 0.0 {
            let bytes_diff = transferred_bytes.saturating_sub(self.last_bytes);
            self.progress.bytes_per_second = (bytes_diff as f64 / elapsed) as u64;
        }

        if self.progress.bytes_per_second > 0 {
            let remaining_bytes = self.progress.total_bytes.saturating_sub(transferred_bytes);
            self.progress.eta_seconds = remaining_bytes / self.progress.bytes_per_second;
        }

        self.last_update_time = now;
        self.last_bytes = transferred_bytes;
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average speed since the download started
    pub fn average_speed(&self) -> u64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            (self.progress.transferred_bytes as f64 / elapsed) as u64
        } else {
            0
        }
    }

    pub fn progress(&self) -> &TransferProgress {
        &self.progress
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format speed as human-readable string
pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}
