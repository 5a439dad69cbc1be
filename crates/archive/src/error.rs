//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bytes are not a readable zip container.
    #[display("not a valid archive container")]
    InvalidContainer,
    /// The container is fine, but it has no `metadata.yaml` entry.
    #[display("archive has no manifest")]
    MissingManifest,
    /// The manifest exists but isn't YAML, or lacks a required field.
    #[display("manifest is malformed")]
    InvalidManifest,
    /// Reading or writing the archive failed.
    #[display("I/O error")]
    Io,
    /// Wraps any of the above with the file it happened to.
    #[display("unreadable archive: {}", _0.display())]
    Unreadable(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
