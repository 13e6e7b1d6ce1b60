//! Synchronization settings
//!
//! [`SyncConfig`] is built once per process and stays immutable while a pass
//! runs. [`SyncProfile`] is its on-disk counterpart: every field optional,
//! loaded from TOML, JSON or YAML and overlaid by command-line flags.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use mirror_fs::{ConfigStore, NormalizedPath, RobustnessConfig, SyncPath};
use serde::{Deserialize, Serialize};

use crate::detect::MIN_TIME_FACTOR;
use crate::{Error, Result};

/// Change-detection policy for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Copy when the source is newer than the destination
    #[default]
    Date,
    /// Copy when the bytes differ
    #[serde(alias = "file")]
    Content,
    /// Wipe the destination and copy everything
    Reset,
}

impl FromStr for SyncMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date" => Ok(SyncMode::Date),
            "file" | "content" => Ok(SyncMode::Content),
            "reset" => Ok(SyncMode::Reset),
            _ => Err(Error::InvalidMode {
                mode: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Date => write!(f, "date"),
            SyncMode::Content => write!(f, "file"),
            SyncMode::Reset => write!(f, "reset"),
        }
    }
}

/// Settings for a synchronization run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Authoritative tree
    pub source: PathBuf,
    /// Mirror tree
    pub destination: PathBuf,
    pub mode: SyncMode,
    /// Pause between passes; zero runs a single pass
    pub interval: Duration,
    /// Remove ignored files (and directories under directory rules) from the destination
    pub delete_ignored: bool,
    /// Destination timestamp granularity in microseconds
    pub time_factor: f64,
    /// Change log location; defaults to `log.txt` in the destination
    pub log_path: Option<PathBuf>,
    pub robustness: RobustnessConfig,
}

impl SyncConfig {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            mode: SyncMode::default(),
            interval: Duration::ZERO,
            delete_ignored: false,
            time_factor: 1.0,
            log_path: None,
            robustness: RobustnessConfig::default(),
        }
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_delete_ignored(mut self, delete_ignored: bool) -> Self {
        self.delete_ignored = delete_ignored;
        self
    }

    pub fn with_time_factor(mut self, time_factor: f64) -> Self {
        self.time_factor = time_factor;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(log_path.into());
        self
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    /// Effective change log location.
    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.destination.join(SyncPath::LogFile))
    }

    /// Location of the change log relative to the destination root, if the
    /// log lives inside the destination tree.
    pub fn log_relative_path(&self) -> Option<NormalizedPath> {
        let log = self.log_path();
        if let Ok(relative) = log.strip_prefix(&self.destination) {
            return Some(NormalizedPath::new(relative));
        }

        let destination = resolve(&self.destination);
        let log = resolve(&log);
        log.strip_prefix(&destination)
            .ok()
            .map(NormalizedPath::new)
    }

    /// Check the settings before a pass.
    ///
    /// # Errors
    ///
    /// Fails when the source is missing or not a directory, the destination
    /// exists but is not a directory, the two trees overlap, or the time
    /// factor is not finite or below [`MIN_TIME_FACTOR`].
    pub fn validate(&self) -> Result<()> {
        if !self.time_factor.is_finite() || self.time_factor < MIN_TIME_FACTOR {
            return Err(Error::InvalidTimeFactor {
                value: self.time_factor,
            });
        }

        if !self.source.exists() {
            return Err(Error::SourceNotFound {
                path: self.source.clone(),
            });
        }
        if !self.source.is_dir() {
            return Err(Error::NotADirectory {
                path: self.source.clone(),
            });
        }
        if self.destination.exists() && !self.destination.is_dir() {
            return Err(Error::NotADirectory {
                path: self.destination.clone(),
            });
        }

        let source = resolve(&self.source);
        let destination = resolve(&self.destination);
        if source.starts_with(&destination) || destination.starts_with(&source) {
            return Err(Error::OverlappingRoots {
                source_root: self.source.clone(),
                destination: self.destination.clone(),
            });
        }

        Ok(())
    }
}

/// Canonical form of a path that may not exist yet.
///
/// Walks up to the nearest existing ancestor, canonicalizes it and re-appends
/// the missing tail.
fn resolve(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        if let Ok(canonical) = mirror_fs::io::canonicalize(current) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Settings file contents. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncProfile {
    pub source: Option<PathBuf>,
    #[serde(alias = "sync")]
    pub destination: Option<PathBuf>,
    pub mode: Option<SyncMode>,
    /// Seconds between passes
    pub interval: Option<u64>,
    #[serde(alias = "delete_ignored")]
    pub delete: Option<bool>,
    pub time_factor: Option<f64>,
    #[serde(alias = "log_path")]
    pub log: Option<PathBuf>,
    pub robustness: Option<RobustnessConfig>,
}

impl SyncProfile {
    /// Load a profile; the format follows the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    /// Turn the profile into a config; `None` when either root is missing.
    pub fn into_config(self) -> Option<SyncConfig> {
        let defaults = SyncConfig::new(self.source?, self.destination?);
        Some(SyncConfig {
            mode: self.mode.unwrap_or(defaults.mode),
            interval: self
                .interval
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            delete_ignored: self.delete.unwrap_or(defaults.delete_ignored),
            time_factor: self.time_factor.unwrap_or(defaults.time_factor),
            log_path: self.log,
            robustness: self.robustness.unwrap_or(defaults.robustness),
            ..defaults
        })
    }
}
