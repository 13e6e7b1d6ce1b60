//! Pass planning
//!
//! Walks both trees once, applies the ignore rules and the change detector,
//! and produces the ordered operation list for a pass. Planning never
//! touches the filesystem beyond reading it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use mirror_fs::{FileEntry, NormalizedPath, TreeEntry, TreeWalker};
use tracing::{debug, warn};

use crate::{ChangeDetector, IgnoreMatcher, SyncConfig, SyncMode};

/// Why a file is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// No destination file existed
    Added,
    /// The destination file is out of date
    Modified,
}

/// A single planned filesystem change, relative to the tree roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOperation {
    Copy {
        path: NormalizedPath,
        reason: CopyReason,
    },
    Delete {
        path: NormalizedPath,
        in_destination: bool,
    },
    /// Remove a destination directory emptied by this pass
    RemoveDir { path: NormalizedPath },
    /// Remove a destination entry whose name is not valid UTF-8.
    ///
    /// `raw` is the exact relative path; `path` is its lossy form for logs.
    Purge {
        path: NormalizedPath,
        raw: PathBuf,
        directory: bool,
    },
}

impl SyncOperation {
    pub fn path(&self) -> &NormalizedPath {
        match self {
            Self::Copy { path, .. }
            | Self::Delete { path, .. }
            | Self::RemoveDir { path }
            | Self::Purge { path, .. } => path,
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, Self::Copy { .. })
    }

    /// True for file and directory removals.
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            Self::Delete { .. } | Self::RemoveDir { .. } | Self::Purge { .. }
        )
    }

    /// Single-letter action code used in the change log.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Copy {
                reason: CopyReason::Added,
                ..
            } => "A",
            Self::Copy {
                reason: CopyReason::Modified,
                ..
            } => "M",
            Self::Delete { .. } | Self::RemoveDir { .. } | Self::Purge { .. } => "D",
        }
    }

    /// The path as written in the log; directories carry a trailing `/`.
    pub fn display_path(&self) -> String {
        match self {
            Self::RemoveDir { path }
            | Self::Purge {
                path,
                directory: true,
                ..
            } => format!("{path}/"),
            other => other.path().to_string(),
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.display_path())
    }
}

/// Which tree a plan issue came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tree {
    Source,
    Destination,
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tree::Source => write!(f, "source"),
            Tree::Destination => write!(f, "destination"),
        }
    }
}

/// An entry that could not be read while walking a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanIssue {
    pub tree: Tree,
    /// Path of the failing entry, relative to its root where possible
    pub path: String,
    pub detail: String,
}

impl PlanIssue {
    fn unnamed(tree: Tree, raw: &Path) -> Self {
        Self {
            tree,
            path: raw.to_string_lossy().replace('\\', "/"),
            detail: "name is not valid UTF-8".into(),
        }
    }

    fn new(tree: Tree, root: &Path, error: mirror_fs::Error) -> Self {
        let (path, detail) = match error {
            mirror_fs::Error::Walk { path, source } | mirror_fs::Error::Io { path, source } => {
                (path, source.to_string())
            }
            mirror_fs::Error::NonUtf8Path { path } => (path, "name is not valid UTF-8".into()),
            other => (root.to_path_buf(), other.to_string()),
        };
        let path = match path.strip_prefix(root) {
            Ok(relative) if !relative.as_os_str().is_empty() => {
                NormalizedPath::new(relative).to_string()
            }
            _ => path.display().to_string(),
        };
        Self { tree, path, detail }
    }
}

/// Ordered operations for one pass plus the walk errors met on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub operations: Vec<SyncOperation>,
    pub issues: Vec<PlanIssue>,
}

impl SyncPlan {
    pub fn copies(&self) -> usize {
        self.operations.iter().filter(|op| op.is_copy()).count()
    }

    pub fn deletes(&self) -> usize {
        self.operations.iter().filter(|op| op.is_delete()).count()
    }

    /// True when there is nothing to do and nothing to report.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.issues.is_empty()
    }
}

/// Combines the walker, the ignore rules and the change detector.
///
/// Deletions come first (files, then directories deepest first), copies
/// last; each group keeps tree-walk order.
#[derive(Debug)]
pub struct SyncPlanner<'a> {
    config: &'a SyncConfig,
    ignore: &'a IgnoreMatcher,
    detector: ChangeDetector,
    /// The change log, when it lives inside the destination
    log: Option<NormalizedPath>,
}

impl<'a> SyncPlanner<'a> {
    pub fn new(config: &'a SyncConfig, ignore: &'a IgnoreMatcher) -> Self {
        Self {
            config,
            ignore,
            detector: ChangeDetector::new(
                config.mode,
                config.time_factor,
                &config.source,
                &config.destination,
            ),
            log: config.log_relative_path(),
        }
    }

    pub fn plan(&self) -> SyncPlan {
        let mut plan = SyncPlan::default();
        let destination = self.walk_destination(&mut plan);

        let index: HashMap<&NormalizedPath, &FileEntry> = destination
            .iter()
            .filter_map(|entry| match entry {
                TreeEntry::File(file) => Some((&file.path, file)),
                _ => None,
            })
            .collect();
        let (copies, source_paths) = self.plan_copies(&index, &mut plan);

        let mut deletes = Vec::new();
        let mut directories = Vec::new();
        if self.config.mode == SyncMode::Reset {
            self.plan_wipe(&destination, &mut deletes, &mut directories);
        } else {
            if self.config.delete_ignored {
                self.plan_ignored_removal(&destination, &mut deletes, &mut directories);
            }
            self.plan_stale_temps(&destination, &source_paths, &mut deletes);
            self.report_unnamed(&destination, &deletes, &directories, &mut plan);
        }

        plan.operations.extend(deletes);
        plan.operations.extend(directories);
        plan.operations.extend(copies);

        debug!(
            copies = plan.copies(),
            deletes = plan.deletes(),
            issues = plan.issues.len(),
            "Planned pass"
        );
        plan
    }

    fn is_log(&self, path: &NormalizedPath) -> bool {
        self.log.as_ref() == Some(path)
    }

    fn contains_log(&self, dir: &NormalizedPath) -> bool {
        self.log.as_ref().is_some_and(|log| log.is_within(dir))
    }

    /// One walk of the destination, contents before their directory.
    fn walk_destination(&self, plan: &mut SyncPlan) -> Vec<TreeEntry> {
        let root = &self.config.destination;
        // Nothing to compare against yet; the engine creates it before executing
        if !root.exists() {
            return Vec::new();
        }

        let mut entries = Vec::new();
        for entry in TreeWalker::new(root).entries() {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => plan.issues.push(PlanIssue::new(Tree::Destination, root, e)),
            }
        }
        entries
    }

    /// Plans the copies and returns every source path seen, ignored or not.
    fn plan_copies(
        &self,
        destination: &HashMap<&NormalizedPath, &FileEntry>,
        plan: &mut SyncPlan,
    ) -> (Vec<SyncOperation>, HashSet<NormalizedPath>) {
        let root = &self.config.source;
        let mut copies = Vec::new();
        let mut seen = HashSet::new();

        for entry in TreeWalker::new(root).walk() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    plan.issues.push(PlanIssue::new(Tree::Source, root, e));
                    continue;
                }
            };
            seen.insert(entry.path.clone());

            if self.is_log(&entry.path) {
                warn!(path = %entry.path, "Source file shadows the change log location, skipping");
                continue;
            }
            if self.ignore.is_ignored(&entry.path) {
                debug!(path = %entry.path, "Ignored");
                continue;
            }

            let existing = destination.get(&entry.path).copied();
            if !self.detector.needs_copy(&entry, existing) {
                continue;
            }

            let reason = match (self.config.mode, existing) {
                (SyncMode::Reset, _) | (_, None) => CopyReason::Added,
                (_, Some(_)) => CopyReason::Modified,
            };
            copies.push(SyncOperation::Copy {
                path: entry.path,
                reason,
            });
        }

        (copies, seen)
    }

    /// Reset: remove every destination entry except the log and, without the
    /// delete flag, ignored files.
    fn plan_wipe(
        &self,
        destination: &[TreeEntry],
        deletes: &mut Vec<SyncOperation>,
        directories: &mut Vec<SyncOperation>,
    ) {
        let keep = |path: &NormalizedPath| {
            self.is_log(path) || (self.ignore.is_ignored(path) && !self.config.delete_ignored)
        };
        let preserved: Vec<&NormalizedPath> = destination
            .iter()
            .filter_map(|entry| match entry {
                TreeEntry::File(FileEntry { path, .. }) | TreeEntry::Link(path) if keep(path) => {
                    Some(path)
                }
                _ => None,
            })
            .collect();

        for entry in destination {
            match entry {
                TreeEntry::File(FileEntry { path, .. }) | TreeEntry::Link(path) => {
                    if !keep(path) {
                        deletes.push(SyncOperation::Delete {
                            path: path.clone(),
                            in_destination: true,
                        });
                    }
                }
                TreeEntry::Directory(dir) => {
                    if !self.contains_log(dir) && !preserved.iter().any(|kept| kept.is_within(dir)) {
                        directories.push(SyncOperation::RemoveDir { path: dir.clone() });
                    }
                }
                TreeEntry::Unnamed { path, is_dir: true } => directories.push(purge(path, true)),
                TreeEntry::Unnamed { path, is_dir: false } => deletes.push(purge(path, false)),
            }
        }
    }

    /// Delete flag outside Reset: remove ignored destination files and the
    /// directories named by directory rules.
    fn plan_ignored_removal(
        &self,
        destination: &[TreeEntry],
        deletes: &mut Vec<SyncOperation>,
        directories: &mut Vec<SyncOperation>,
    ) {
        for entry in destination {
            match entry {
                TreeEntry::File(FileEntry { path, .. }) | TreeEntry::Link(path)
                    if !self.is_log(path) && self.ignore.is_ignored(path) =>
                {
                    deletes.push(SyncOperation::Delete {
                        path: path.clone(),
                        in_destination: true,
                    });
                }
                TreeEntry::Directory(dir)
                    if self.ignore.is_ignored_dir(dir) && !self.contains_log(dir) =>
                {
                    directories.push(SyncOperation::RemoveDir { path: dir.clone() });
                }
                TreeEntry::Unnamed { path, is_dir: true }
                    if self.ignore.is_ignored_dir(&named_ancestor(path)) =>
                {
                    directories.push(purge(path, true));
                }
                TreeEntry::Unnamed { path, is_dir: false }
                    if self.ignore.is_ignored_dir(&named_ancestor(path)) =>
                {
                    deletes.push(purge(path, false));
                }
                _ => {}
            }
        }
    }

    /// Temp files left behind by an interrupted copy. A source file with
    /// the same path and ignored files are left alone.
    fn plan_stale_temps(
        &self,
        destination: &[TreeEntry],
        source: &HashSet<NormalizedPath>,
        deletes: &mut Vec<SyncOperation>,
    ) {
        for entry in destination {
            let TreeEntry::File(FileEntry { path, .. }) = entry else {
                continue;
            };
            let name = path.as_str().rsplit('/').next().unwrap_or_default();
            if !mirror_fs::io::is_temp_sibling(name)
                || source.contains(path)
                || self.is_log(path)
                || self.ignore.is_ignored(path)
            {
                continue;
            }

            debug!(path = %path, "Stale temp file from an interrupted copy");
            deletes.push(SyncOperation::Delete {
                path: path.clone(),
                in_destination: true,
            });
        }
    }

    /// Unnamed destination entries that are not being removed. Only the
    /// topmost one of a non-UTF-8 subtree is reported.
    fn report_unnamed(
        &self,
        destination: &[TreeEntry],
        deletes: &[SyncOperation],
        directories: &[SyncOperation],
        plan: &mut SyncPlan,
    ) {
        let purged: HashSet<&Path> = deletes
            .iter()
            .chain(directories)
            .filter_map(|op| match op {
                SyncOperation::Purge { raw, .. } => Some(raw.as_path()),
                _ => None,
            })
            .collect();

        for entry in destination {
            let TreeEntry::Unnamed { path, .. } = entry else {
                continue;
            };
            let topmost = path.parent().is_none_or(|parent| parent.to_str().is_some());
            if topmost && !purged.contains(path.as_path()) {
                plan.issues.push(PlanIssue::unnamed(Tree::Destination, path));
            }
        }
    }
}

fn purge(raw: &Path, directory: bool) -> SyncOperation {
    SyncOperation::Purge {
        path: NormalizedPath::new(raw),
        raw: raw.to_path_buf(),
        directory,
    }
}

/// The longest leading part of `raw` that is valid UTF-8.
fn named_ancestor(raw: &Path) -> NormalizedPath {
    raw.ancestors()
        .skip(1)
        .find_map(Path::to_str)
        .map(NormalizedPath::from)
        .unwrap_or_else(|| NormalizedPath::from(""))
}
