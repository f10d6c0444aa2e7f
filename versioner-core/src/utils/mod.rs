//! Utility modules for the versioning engine.

pub mod errors;
pub mod logger;

pub use errors::{Result, VersionerError};
