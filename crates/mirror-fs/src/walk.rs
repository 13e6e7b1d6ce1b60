//! Tree walking for the source and destination roots
//!
//! Walks are lazy and restartable: every call to [`TreeWalker::walk`] starts
//! a fresh traversal, so nothing is cached between passes.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::{Error, NormalizedPath, Result};

/// A regular file found under a walked root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the walked root
    pub path: NormalizedPath,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

/// Any entry found below a walked root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    File(FileEntry),
    Directory(NormalizedPath),
    /// Symlinks and special files; links are never followed
    Link(NormalizedPath),
    /// An entry whose relative path is not valid UTF-8, kept by its raw path
    Unnamed { path: PathBuf, is_dir: bool },
}

/// Enumerates regular files below a root directory.
///
/// Symlinks are never followed, so cyclic link structures cannot make a
/// walk infinite. Entries come out in file-name order within each directory.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
}

impl TreeWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Lazily walk all regular files below the root.
    ///
    /// Errors on individual entries (permission denied, vanished files,
    /// non-UTF-8 names) are yielded in place and the walk continues.
    pub fn walk(&self) -> Walk {
        Walk {
            root: self.root.clone(),
            inner: WalkDir::new(&self.root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
        }
    }

    /// Walk every entry below the root, directory contents before the
    /// directory itself.
    ///
    /// Unlike [`walk`](Self::walk) this yields directories, links and
    /// entries with non-UTF-8 names; only unreadable entries are errors.
    /// The root itself is not yielded.
    pub fn entries(&self) -> impl Iterator<Item = Result<TreeEntry>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .contents_first(true)
            .min_depth(1)
            .into_iter()
            .map(move |entry| match entry {
                Ok(entry) => tree_entry(&self.root, &entry),
                Err(err) => Err(walk_error(&self.root, err)),
            })
    }
}

/// Lazy iterator returned by [`TreeWalker::walk`].
pub struct Walk {
    root: PathBuf,
    inner: walkdir::IntoIter,
}

impl Iterator for Walk {
    type Item = Result<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(walk_error(&self.root, err))),
            };

            if !entry.file_type().is_file() {
                continue;
            }

            return Some(file_entry(&self.root, &entry));
        }
    }
}

impl std::fmt::Debug for Walk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walk").field("root", &self.root).finish()
    }
}

fn file_entry(root: &Path, entry: &walkdir::DirEntry) -> Result<FileEntry> {
    let path = NormalizedPath::relative_to(root, entry.path())?;
    let metadata = entry
        .metadata()
        .map_err(|err| walk_error(root, err))?;
    let modified = metadata
        .modified()
        .map_err(|e| Error::io(entry.path(), e))?;

    Ok(FileEntry {
        path,
        size: metadata.len(),
        modified,
    })
}

fn tree_entry(root: &Path, entry: &walkdir::DirEntry) -> Result<TreeEntry> {
    let kind = entry.file_type();
    let path = match NormalizedPath::relative_to(root, entry.path()) {
        Ok(path) => path,
        Err(Error::NonUtf8Path { .. }) => {
            let raw = entry.path().strip_prefix(root).unwrap_or(entry.path());
            return Ok(TreeEntry::Unnamed {
                path: raw.to_path_buf(),
                is_dir: kind.is_dir(),
            });
        }
        Err(e) => return Err(e),
    };

    if kind.is_dir() {
        Ok(TreeEntry::Directory(path))
    } else if kind.is_file() {
        file_entry(root, entry).map(TreeEntry::File)
    } else {
        Ok(TreeEntry::Link(path))
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> Error {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    Error::Walk { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn walk_yields_files_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("top.txt"), "top").unwrap();
        fs::write(dir.path().join("nested/deeper/leaf.txt"), "leaf").unwrap();

        let paths: Vec<String> = TreeWalker::new(dir.path())
            .walk()
            .map(|e| e.unwrap().path.as_str().to_string())
            .collect();

        assert_eq!(paths, vec!["nested/deeper/leaf.txt", "top.txt"]);
    }

    #[test]
    fn walk_reports_size() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("five.txt"), "12345").unwrap();

        let entry = TreeWalker::new(dir.path()).walk().next().unwrap().unwrap();
        assert_eq!(entry.size, 5);
    }

    #[test]
    fn walk_is_restartable() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let walker = TreeWalker::new(dir.path());
        assert_eq!(walker.walk().count(), 1);
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        assert_eq!(walker.walk().count(), 2);
    }

    #[test]
    fn entries_list_contents_before_their_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::write(dir.path().join("a/b/f.txt"), "f").unwrap();
        fs::write(dir.path().join("z.txt"), "z").unwrap();

        let entries: Vec<String> = TreeWalker::new(dir.path())
            .entries()
            .map(|e| match e.unwrap() {
                TreeEntry::Directory(path) => format!("{path}/"),
                TreeEntry::File(file) => file.path.to_string(),
                other => panic!("unexpected entry {other:?}"),
            })
            .collect();

        assert_eq!(entries, vec!["a/b/c/", "a/b/f.txt", "a/b/", "a/", "z.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn entries_include_links_without_following_them() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/file.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let entries: Vec<TreeEntry> = TreeWalker::new(dir.path())
            .entries()
            .map(Result::unwrap)
            .collect();

        assert!(entries.contains(&TreeEntry::Link(NormalizedPath::new("link"))));
        assert!(!entries.iter().any(
            |e| matches!(e, TreeEntry::File(file) if file.path.as_str().starts_with("link/"))
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn entries_keep_non_utf8_names_raw() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let bad = OsStr::from_bytes(b"bad\xff");
        fs::create_dir(dir.path().join(bad)).unwrap();
        fs::write(dir.path().join(bad).join("f"), "x").unwrap();

        let entries: Vec<TreeEntry> = TreeWalker::new(dir.path())
            .entries()
            .map(Result::unwrap)
            .collect();

        assert_eq!(
            entries,
            vec![
                TreeEntry::Unnamed {
                    path: PathBuf::from(bad).join("f"),
                    is_dir: false,
                },
                TreeEntry::Unnamed {
                    path: PathBuf::from(bad),
                    is_dir: true,
                },
            ]
        );
    }

    #[test]
    fn missing_root_is_reported_not_panicked() {
        let dir = TempDir::new().unwrap();
        let results: Vec<_> = TreeWalker::new(dir.path().join("absent")).walk().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/file.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("real/loop")).unwrap();

        let count = TreeWalker::new(dir.path()).walk().filter(|e| e.is_ok()).count();
        assert_eq!(count, 1);
    }
}
