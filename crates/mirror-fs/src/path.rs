//! Normalized path handling for tree-relative paths

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
///
/// Relative paths inside the source and destination trees are compared as
/// plain strings (ignore rules, destination lookups), so every path is
/// normalized once on the way in and converted back to the platform-native
/// form only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Converts backslashes to forward slashes, drops empty and `.`
    /// components and keeps a leading `/` for absolute paths.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::from_str_lossy(&path.as_ref().to_string_lossy())
    }

    fn from_str_lossy(raw: &str) -> Self {
        let unified = raw.replace('\\', "/");
        let absolute = unified.starts_with('/');
        let joined = unified
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect::<Vec<_>>()
            .join("/");
        let inner = if absolute {
            format!("/{joined}")
        } else {
            joined
        };
        Self { inner }
    }

    /// Build the path of `full` relative to `root`.
    ///
    /// # Errors
    ///
    /// Fails when `full` is not below `root` or is not valid UTF-8; relative
    /// paths must be representable as strings to be matched against rules.
    pub fn relative_to(root: &Path, full: &Path) -> Result<Self> {
        let relative = full.strip_prefix(root).map_err(|_| Error::Io {
            path: full.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not below {}", root.display()),
            ),
        })?;
        let text = relative.to_str().ok_or_else(|| Error::NonUtf8Path {
            path: full.to_path_buf(),
        })?;
        Ok(Self::from_str_lossy(text))
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// True for the empty path (the tree root itself).
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Resolve this relative path below `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        if self.inner.is_empty() {
            return root.to_path_buf();
        }
        self.inner
            .split('/')
            .fold(root.to_path_buf(), |acc, part| acc.join(part))
    }

    /// True when this path equals `dir` or lies anywhere below it.
    pub fn is_within(&self, dir: &NormalizedPath) -> bool {
        if dir.inner.is_empty() {
            return true;
        }
        self.inner == dir.inner
            || (self.inner.starts_with(&dir.inner)
                && self.inner.as_bytes().get(dir.inner.len()) == Some(&b'/'))
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::from_str_lossy(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::from_str_lossy(&s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_unifies_separators() {
        let path = NormalizedPath::new("docs\\guide\\intro.md");
        assert_eq!(path.as_str(), "docs/guide/intro.md");
    }

    #[test]
    fn new_drops_dot_and_empty_components() {
        let path = NormalizedPath::new("./a//b/./c.txt");
        assert_eq!(path.as_str(), "a/b/c.txt");
    }

    #[test]
    fn is_within_requires_component_boundary() {
        let dir = NormalizedPath::new("build");
        assert!(NormalizedPath::new("build").is_within(&dir));
        assert!(NormalizedPath::new("build/out/app.bin").is_within(&dir));
        assert!(!NormalizedPath::new("builder/app.bin").is_within(&dir));
    }

    #[test]
    fn resolve_joins_each_component() {
        let root = Path::new("/tmp/root");
        let resolved = NormalizedPath::new("a/b.txt").resolve(root);
        assert_eq!(resolved, root.join("a").join("b.txt"));
    }

    #[test]
    fn relative_to_strips_root() {
        let root = Path::new("/data/src");
        let rel = NormalizedPath::relative_to(root, &root.join("x").join("y.txt")).unwrap();
        assert_eq!(rel.as_str(), "x/y.txt");
    }

    #[test]
    fn relative_to_rejects_foreign_path() {
        let result = NormalizedPath::relative_to(Path::new("/data/src"), Path::new("/etc/passwd"));
        assert!(result.is_err());
    }
}
