//! Change detection
//!
//! One comparison per [`SyncMode`]. Date comparisons are scaled by the time
//! factor so a destination that stores coarser timestamps than the source
//! (whole seconds, FAT's two seconds) does not look stale forever.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use mirror_fs::FileEntry;
use tracing::warn;

use crate::SyncMode;

/// Added before flooring scaled timestamps to absorb float rounding.
pub const DATE_EPSILON: f64 = 1e-9;

/// Smallest accepted time factor. Any 64-bit microsecond timestamp divided
/// by it still fits the `i128` tick range.
pub const MIN_TIME_FACTOR: f64 = 1e-12;

/// Convert a timestamp into destination ticks.
///
/// `time_factor` is the destination granularity in microseconds: `1.0`
/// keeps microseconds, `1e6` yields whole seconds.
pub fn ticks(time: SystemTime, time_factor: f64) -> i128 {
    let micros = match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_micros() as f64,
        Err(before) => -(before.duration().as_micros() as f64),
    };
    (micros / time_factor + DATE_EPSILON).floor() as i128
}

/// Decides whether a source file must be copied.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    mode: SyncMode,
    time_factor: f64,
    source_root: PathBuf,
    destination_root: PathBuf,
}

impl ChangeDetector {
    pub fn new(
        mode: SyncMode,
        time_factor: f64,
        source_root: impl Into<PathBuf>,
        destination_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mode,
            time_factor,
            source_root: source_root.into(),
            destination_root: destination_root.into(),
        }
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// True when `source` has to be copied over `destination`.
    ///
    /// An absent destination always needs a copy.
    pub fn needs_copy(&self, source: &FileEntry, destination: Option<&FileEntry>) -> bool {
        let Some(destination) = destination else {
            return true;
        };

        match self.mode {
            SyncMode::Date => self.is_newer(source, destination),
            SyncMode::Content => self.differs(source, destination),
            SyncMode::Reset => true,
        }
    }

    fn is_newer(&self, source: &FileEntry, destination: &FileEntry) -> bool {
        ticks(source.modified, self.time_factor) > ticks(destination.modified, self.time_factor)
    }

    fn differs(&self, source: &FileEntry, destination: &FileEntry) -> bool {
        if source.size != destination.size {
            return true;
        }

        let src = source.path.resolve(&self.source_root);
        let dst = destination.path.resolve(&self.destination_root);
        match mirror_fs::io::files_identical(&src, &dst) {
            Ok(identical) => !identical,
            Err(e) => {
                warn!(path = %source.path, error = %e, "Content comparison failed, copying");
                true
            }
        }
    }
}
