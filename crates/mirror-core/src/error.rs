//! Error types for mirror-core

use std::path::PathBuf;

/// Result type for mirror-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a synchronization pass.
///
/// Failures on individual files never surface here; they are captured as
/// operation outcomes and written to the change log instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Source root does not exist
    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// A root exists but is not a directory
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Source and destination are the same tree or nested in one another
    #[error("Source {source_root} and destination {destination} overlap")]
    OverlappingRoots {
        source_root: PathBuf,
        destination: PathBuf,
    },

    /// Time factor must be finite and at least `MIN_TIME_FACTOR`
    #[error("Invalid time factor: {value} (must be a finite number of at least 1e-12)")]
    InvalidTimeFactor { value: f64 },

    /// Unknown synchronization mode name
    #[error("Invalid mode: {mode} (expected date, file or reset)")]
    InvalidMode { mode: String },

    /// Ignore file contains bytes that are not valid UTF-8
    #[error("Ignore file {path} is not valid UTF-8 (line {line})")]
    IgnoreFileEncoding { path: PathBuf, line: usize },

    /// Another process holds the change log
    #[error("Log file {path} is locked by another mirrorsync instance")]
    LogLocked { path: PathBuf },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from mirror-fs
    #[error(transparent)]
    Fs(#[from] mirror_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
