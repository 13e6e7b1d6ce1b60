//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::Parser;
use mirror_core::SyncMode;

/// mirrorsync - Incrementally mirror a directory tree into another
///
/// Copies new and changed files from SOURCE into SYNC, honoring the
/// exclusion list in SOURCE/.syncignore. Every pass is appended to a log
/// file (SYNC/log.txt unless --log is given).
#[derive(Parser, Debug)]
#[command(name = "mirrorsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source directory (authoritative)
    pub source: Option<PathBuf>,

    /// Destination directory to keep in sync
    pub sync: Option<PathBuf>,

    /// Change detection: date, file (content) or reset
    #[arg(short, long)]
    pub mode: Option<SyncMode>,

    /// Seconds between passes; 0 runs a single pass
    #[arg(short, long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Delete ignored files from the destination
    #[arg(short = 'D', long)]
    pub delete: bool,

    /// Destination timestamp precision in microseconds (1e6 = whole seconds)
    #[arg(short = 'f', long = "time-factor", visible_alias = "time_factor", value_name = "FLOAT")]
    pub time_factor: Option<f64>,

    /// Log file location
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Load settings from a TOML, JSON or YAML profile
    #[arg(short, long, value_name = "PATH", env = "MIRRORSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Show what one pass would do without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
