//! Exclusion rules read from `.syncignore`
//!
//! One rule per line, each an exact path relative to the source root.
//! Plain rules match a single file by string equality; a rule ending in `/`
//! covers the whole subtree of that directory. The same rule set is applied
//! to the source and destination trees within a pass.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use mirror_fs::{NormalizedPath, SyncPath};
use tracing::debug;

use crate::{Error, Result};

/// A single exclusion entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IgnoreRule {
    path: NormalizedPath,
    directory: bool,
}

impl IgnoreRule {
    /// Parse one line of an ignore file.
    ///
    /// Returns `None` for blank lines and `#` comments.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let unified = line.replace('\\', "/");
        let directory = unified.ends_with('/');
        let mut rest = unified.as_str();
        loop {
            if let Some(stripped) = rest.strip_prefix("./") {
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix('/') {
                rest = stripped;
            } else {
                break;
            }
        }

        let path = NormalizedPath::from(rest);
        if path.is_empty() {
            return None;
        }
        Some(Self { path, directory })
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// True for rules written with a trailing `/`.
    pub fn is_directory(&self) -> bool {
        self.directory
    }
}

/// The loaded rule set for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreMatcher {
    files: BTreeSet<NormalizedPath>,
    directories: Vec<NormalizedPath>,
}

impl IgnoreMatcher {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read `.syncignore` from the source root.
    ///
    /// A missing file yields an empty rule set.
    ///
    /// # Errors
    ///
    /// Any other read failure is fatal, as is content that is not valid
    /// UTF-8. The encoding error names the first offending line.
    pub fn load(source_root: &Path) -> Result<Self> {
        let path = source_root.join(SyncPath::IgnoreFile);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No ignore file");
                return Ok(Self::empty());
            }
            Err(e) => return Err(mirror_fs::Error::io(&path, e).into()),
        };

        let text = std::str::from_utf8(&bytes).map_err(|e| Error::IgnoreFileEncoding {
            line: bytes[..e.valid_up_to()]
                .iter()
                .filter(|b| **b == b'\n')
                .count()
                + 1,
            path: path.clone(),
        })?;

        let matcher = Self::parse(text.strip_prefix('\u{feff}').unwrap_or(text));
        debug!(path = %path.display(), rules = matcher.len(), "Loaded ignore rules");
        Ok(matcher)
    }

    /// Build a rule set from ignore-file text.
    pub fn parse(text: &str) -> Self {
        text.lines().filter_map(IgnoreRule::parse).collect()
    }

    /// True when any rule matches the relative path.
    pub fn is_ignored(&self, path: &NormalizedPath) -> bool {
        self.files.contains(path) || self.directories.iter().any(|dir| path.is_within(dir))
    }

    /// True when a directory rule covers this directory.
    pub fn is_ignored_dir(&self, dir: &NormalizedPath) -> bool {
        self.directories.iter().any(|rule| dir.is_within(rule))
    }

    pub fn has_directory_rules(&self) -> bool {
        !self.directories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<IgnoreRule> for IgnoreMatcher {
    fn from_iter<I: IntoIterator<Item = IgnoreRule>>(iter: I) -> Self {
        let mut matcher = Self::empty();
        for rule in iter {
            if rule.directory {
                if !matcher.directories.contains(&rule.path) {
                    matcher.directories.push(rule.path);
                }
            } else {
                matcher.files.insert(rule.path);
            }
        }
        matcher
    }
}
