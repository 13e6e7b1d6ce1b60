//! Append-only change log
//!
//! One block per pass: a separator, a header with the pass counters, one
//! line per executed operation and, for interrupted passes, a footer. Each
//! block is rendered in memory and written with a single call so a failure
//! never leaves half a block behind.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use fs2::FileExt;
use tracing::debug;

use crate::{Error, Outcome, PassReport, Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SEPARATOR_WIDTH: usize = 72;

/// Handle to the pass log, owned by the driver and passed into each pass.
#[derive(Debug)]
pub struct ChangeLog<W: Write> {
    sink: W,
    path: Option<PathBuf>,
}

impl ChangeLog<File> {
    /// Open (or create) a log file for appending.
    ///
    /// Holds an exclusive advisory lock until the handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LogLocked`] if another process holds the lock.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                mirror_fs::io::ensure_dir(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| mirror_fs::Error::io(path, e))?;

        file.try_lock_exclusive().map_err(|e| {
            debug!(path = %path.display(), error = %e, "Log lock unavailable");
            Error::LogLocked {
                path: path.to_path_buf(),
            }
        })?;

        Ok(Self {
            sink: file,
            path: Some(path.to_path_buf()),
        })
    }
}

impl<W: Write> ChangeLog<W> {
    /// Wrap an arbitrary writer; used with in-memory buffers in tests.
    pub fn new(sink: W) -> Self {
        Self { sink, path: None }
    }

    /// Location of a file-backed log.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Append the block for one pass.
    pub fn record(&mut self, report: &PassReport) -> Result<()> {
        let block = render(report);
        let target = self.path.clone().unwrap_or_default();
        self.sink
            .write_all(block.as_bytes())
            .and_then(|()| self.sink.flush())
            .map_err(|e| mirror_fs::Error::io(target, e))?;
        Ok(())
    }
}

fn stamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Render the log block for a pass.
pub fn render(report: &PassReport) -> String {
    let started = stamp(&report.started);
    let mut out = format!(
        "{}\n[{started}] pass #{} mode={} copies={} deletes={} errors={} elapsed={:.3}s\n",
        "=".repeat(SEPARATOR_WIDTH),
        report.pass,
        report.mode,
        report.copies(),
        report.deletes(),
        report.errors(),
        report.elapsed().as_secs_f64(),
    );

    for issue in &report.issues {
        out.push_str(&format!(
            "[{started}] ERROR walk {} {}: {}\n",
            issue.tree, issue.path, issue.detail
        ));
    }

    for entry in &report.outcomes {
        let at = stamp(&entry.at);
        let operation = &entry.operation;
        let line = match &entry.outcome {
            Outcome::Success => format!("[{at}] {operation}\n"),
            Outcome::AlreadySatisfied => format!("[{at}] {operation} (already satisfied)\n"),
            Outcome::Failed(detail) => format!(
                "[{at}] ERROR {} {}: {detail}\n",
                operation.code(),
                operation.display_path()
            ),
        };
        out.push_str(&line);
    }

    if report.interrupted {
        out.push_str(&format!(
            "[{}] interrupted after {} of {} operations\n",
            stamp(&report.finished),
            report.outcomes.len(),
            report.planned
        ));
    }

    out
}
