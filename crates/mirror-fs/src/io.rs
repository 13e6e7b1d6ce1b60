//! Robust file operations used by the sync executor
//!
//! Copies go through a temporary sibling file and an atomic rename, so a
//! destination file is either the old version or the complete new one.
//! Transient failures are retried with exponential backoff.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use filetime::FileTime;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Chunk size for content comparison.
const COMPARE_CHUNK: usize = 64 * 1024;

/// Sits between the target name and the process id in temp file names.
const TEMP_MARKER: &str = ".mirrorsync-";

/// Retry policy for transient I/O failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustnessConfig {
    /// First retry delay in milliseconds
    pub initial_interval_ms: u64,
    /// Give up once this much time has been spent retrying (0 disables retries)
    pub max_elapsed_ms: u64,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 50,
            max_elapsed_ms: 2_000,
        }
    }
}

impl RobustnessConfig {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            initial_interval_ms: 0,
            max_elapsed_ms: 0,
        }
    }

    fn retry<T>(&self, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
        if self.max_elapsed_ms == 0 {
            return op();
        }

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.initial_interval_ms.max(1)))
            .with_max_elapsed_time(Some(Duration::from_millis(self.max_elapsed_ms)))
            .build();

        backoff::retry(policy, || {
            op().map_err(|e| {
                if is_transient(&e) {
                    tracing::debug!("Retrying after transient error: {}", e);
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Create a directory and all missing parents.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))
}

/// Canonicalize a path without producing UNC paths on Windows.
pub fn canonicalize(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path).map_err(|e| Error::io(path, e))
}

/// Copy `src` over `dst`, stamping `dst` with the source modification time.
///
/// Missing parent directories are created. Returns the number of bytes
/// copied.
pub fn copy_file(src: &Path, dst: &Path, robustness: RobustnessConfig) -> Result<u64> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }

    let src_meta = fs::metadata(src).map_err(|e| Error::io(src, e))?;
    let mtime = FileTime::from_last_modification_time(&src_meta);
    let temp_path = temp_sibling(dst);

    let copied = robustness
        .retry(|| fs::copy(src, &temp_path))
        .map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::io(src, e)
        })?;

    if let Err(e) = filetime::set_file_mtime(&temp_path, mtime) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    if let Ok(meta) = fs::symlink_metadata(dst) {
        if meta.is_file() && meta.permissions().readonly() {
            make_writable(dst, meta.permissions())?;
        }
    }

    robustness
        .retry(|| fs::rename(&temp_path, dst))
        .map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::io(dst, e)
        })?;

    Ok(copied)
}

/// Remove a file.
///
/// Returns `false` when the file did not exist, which callers treat as
/// already satisfied. Read-only files are made writable first.
pub fn remove_file(path: &Path, robustness: RobustnessConfig) -> Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::io(path, e)),
    };

    if meta.is_dir() {
        return Err(Error::io(path, io::Error::other("expected a file, found a directory")));
    }

    if meta.permissions().readonly() {
        make_writable(path, meta.permissions())?;
    }

    match robustness.retry(|| fs::remove_file(path)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Remove an empty directory.
///
/// Returns `false` when the directory did not exist. A non-empty directory
/// is an error.
pub fn remove_empty_dir(path: &Path, robustness: RobustnessConfig) -> Result<bool> {
    match robustness.retry(|| fs::remove_dir(path)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Compare two files byte for byte.
///
/// Files of different length are reported as different without reading
/// their contents.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    let len_a = fs::metadata(a).map_err(|e| Error::io(a, e))?.len();
    let len_b = fs::metadata(b).map_err(|e| Error::io(b, e))?.len();
    if len_a != len_b {
        return Ok(false);
    }

    let mut file_a = File::open(a).map_err(|e| Error::io(a, e))?;
    let mut file_b = File::open(b).map_err(|e| Error::io(b, e))?;
    let mut buf_a = vec![0u8; COMPARE_CHUNK];
    let mut buf_b = vec![0u8; COMPARE_CHUNK];

    loop {
        let read_a = fill(&mut file_a, &mut buf_a).map_err(|e| Error::io(a, e))?;
        let read_b = fill(&mut file_b, &mut buf_b).map_err(|e| Error::io(b, e))?;

        if read_a != read_b || buf_a[..read_a] != buf_b[..read_b] {
            return Ok(false);
        }
        if read_a == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Temp file in the same directory as `path` (same filesystem for rename).
fn temp_sibling(path: &Path) -> PathBuf {
    let temp_name = format!(
        ".{}{TEMP_MARKER}{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    path.with_file_name(temp_name)
}

/// True for names produced by an interrupted [`copy_file`], such as
/// `.report.pdf.mirrorsync-4242.tmp`.
pub fn is_temp_sibling(file_name: &str) -> bool {
    let Some(rest) = file_name
        .strip_prefix('.')
        .and_then(|name| name.strip_suffix(".tmp"))
    else {
        return false;
    };

    rest.rsplit_once(TEMP_MARKER).is_some_and(|(target, pid)| {
        !target.is_empty() && !pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit())
    })
}

#[cfg(unix)]
fn make_writable(path: &Path, mut permissions: fs::Permissions) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    permissions.set_mode(permissions.mode() | 0o200);
    fs::set_permissions(path, permissions).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path, mut permissions: fs::Permissions) -> Result<()> {
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions).map_err(|e| Error::io(path, e))
}
