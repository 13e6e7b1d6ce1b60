//! [`TestTree`] builder for sync scenarios.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use filetime::FileTime;
use tempfile::TempDir;
use walkdir::WalkDir;

/// A temporary directory tree with helpers for setting up files with known
/// contents and modification times, and for asserting on the result.
///
/// # Example
///
/// ```rust,no_run
/// use mirror_test_utils::TestTree;
///
/// let src = TestTree::new();
/// src.write_with_mtime("docs/a.txt", "hello", 1_700_000_000);
/// src.assert_file_exists("docs/a.txt");
/// ```
pub struct TestTree {
    temp_dir: TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the tree.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `rel`, written with `/` separators.
    pub fn path(&self, rel: &str) -> PathBuf {
        rel.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root().to_path_buf(), |acc, part| acc.join(part))
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) {
        self.write_bytes(rel, content.as_bytes());
    }

    pub fn write_bytes(&self, rel: &str, content: &[u8]) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content)
            .unwrap_or_else(|e| panic!("Could not write {}: {e}", path.display()));
    }

    /// Write a file and set its mtime to `secs` after the Unix epoch.
    pub fn write_with_mtime(&self, rel: &str, content: &str, secs: i64) {
        self.write(rel, content);
        self.set_mtime(rel, secs);
    }

    pub fn set_mtime(&self, rel: &str, secs: i64) {
        self.set_mtime_precise(rel, secs, 0);
    }

    /// Set an mtime with sub-second precision.
    pub fn set_mtime_precise(&self, rel: &str, secs: i64, nanos: u32) {
        let path = self.path(rel);
        filetime::set_file_mtime(&path, FileTime::from_unix_time(secs, nanos))
            .unwrap_or_else(|e| panic!("Could not set mtime of {}: {e}", path.display()));
    }

    /// Modification time in whole seconds since the epoch.
    pub fn mtime_secs(&self, rel: &str) -> u64 {
        fs::metadata(self.path(rel))
            .and_then(|m| m.modified())
            .unwrap()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    pub fn read(&self, rel: &str) -> String {
        let path = self.path(rel);
        fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    /// Relative paths (with `/` separators) of every file in the tree.
    pub fn file_set(&self) -> BTreeSet<String> {
        WalkDir::new(self.root())
            .into_iter()
            .map(|entry| entry.unwrap())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(self.root())
                    .unwrap()
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }

    /// Assert that `rel` exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, rel: &str) {
        let full_path = self.path(rel);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `rel` does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_missing(&self, rel: &str) {
        let full_path = self.path(rel);
        assert!(
            !full_path.exists(),
            "Expected path NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `rel` has exactly `content`.
    pub fn assert_content(&self, rel: &str, content: &str) {
        let actual = self.read(rel);
        assert_eq!(
            actual,
            content,
            "File {} has unexpected content",
            self.path(rel).display()
        );
    }
}
