//! Console rendering of engine progress.

use std::sync::atomic::{AtomicU32, Ordering};
use versioner_core::transfer::progress::{format_bytes, format_duration, format_speed, TransferProgress};
use versioner_core::ProgressSink;

/// Prints each checkpoint with the cumulative percentage
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    done: AtomicU32,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative percentage reported so far, capped at 100.
    pub fn percent(&self) -> u32 {
        self.done.load(Ordering::Relaxed).min(100)
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&self, increment: u32, message: &str) {
        let total = self.done.fetch_add(increment, Ordering::Relaxed).saturating_add(increment);
        println!("[{:>3}%] {}", total.min(100), message);
    }
}

/// One line describing a running download.
pub fn transfer_line(progress: &TransferProgress) -> String {
    let mut line = format!(
        "{:>5.1}%  {} / {}",
        progress.percent_complete,
        format_bytes(progress.transferred_bytes),
        format_bytes(progress.total_bytes),
    );

    if progress.bytes_per_second > 0 {
        line.push_str(&format!(
            "  {}  ETA {}",
            format_speed(progress.bytes_per_second),
            format_duration(progress.eta_seconds)
        ));
    }

    if let Some(file) = &progress.current_file {
        line.push_str(&format!("  {file}"));
    }

    line
}
