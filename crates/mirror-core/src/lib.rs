//! Synchronization engine for mirrorsync
//!
//! Mirrors a source tree into a destination tree, one pass at a time:
//!
//! - **IgnoreMatcher**: exclusion rules from `.syncignore`
//! - **ChangeDetector**: date, content or reset comparison per file
//! - **SyncPlanner**: ordered deletes and copies for a pass
//! - **SyncExecutor**: applies a plan, recording per-operation outcomes
//! - **ChangeLog**: append-only, human-readable record of every pass
//! - **SyncEngine**: ties the above together; [`run_schedule`] repeats it
//!
//! ```text
//!                  mirror-cli
//!                      |
//!                 mirror-core
//!                      |
//!                  mirror-fs
//! ```

pub mod changelog;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod execute;
pub mod ignore;
pub mod plan;
pub mod schedule;
pub mod stop;

pub use changelog::ChangeLog;
pub use config::{SyncConfig, SyncMode, SyncProfile};
pub use detect::ChangeDetector;
pub use engine::{PassReport, SyncEngine};
pub use error::{Error, Result};
pub use execute::{Execution, OperationOutcome, Outcome, SyncExecutor};
pub use ignore::{IgnoreMatcher, IgnoreRule};
pub use plan::{CopyReason, PlanIssue, SyncOperation, SyncPlan, SyncPlanner, Tree};
pub use schedule::{ScheduleSummary, run_schedule};
pub use stop::StopToken;
