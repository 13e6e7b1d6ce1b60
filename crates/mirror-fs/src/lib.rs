//! Filesystem layer for mirrorsync
//!
//! Provides normalized relative paths, tree walking and the robust file
//! operations the sync engine builds on.

pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;
pub mod walk;

pub use config::ConfigStore;
pub use constants::SyncPath;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::NormalizedPath;
pub use walk::{FileEntry, TreeEntry, TreeWalker};
