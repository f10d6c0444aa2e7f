//! Progress accounting shared by local and remote operations.

pub mod progress;

pub use progress::{
    format_bytes, format_duration, format_speed, DownloadProgress, ManifestEntry, NoopProgress,
    ProgressSink, RecordedProgress, TransferProgress,
};
