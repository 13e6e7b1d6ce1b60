//! SyncEngine: one synchronization pass
//!
//! A pass validates the roots, reloads the ignore rules, plans, executes and
//! appends the outcome to the change log. Passes share nothing but the log
//! handle and the filesystem.

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::{
    ChangeLog, CopyReason, Execution, IgnoreMatcher, OperationOutcome, Outcome, PlanIssue, Result,
    StopToken, SyncConfig, SyncExecutor, SyncMode, SyncOperation, SyncPlan, SyncPlanner,
};

/// What happened during one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    /// 1-based pass counter of the running process
    pub pass: u64,
    pub mode: SyncMode,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    /// Number of operations in the plan
    pub planned: usize,
    pub outcomes: Vec<OperationOutcome>,
    pub issues: Vec<PlanIssue>,
    pub interrupted: bool,
}

impl PassReport {
    fn count(&self, predicate: impl Fn(&SyncOperation) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == Outcome::Success && predicate(&o.operation))
            .count()
    }

    /// Files copied that did not exist in the destination.
    pub fn added(&self) -> usize {
        self.count(|op| {
            matches!(
                op,
                SyncOperation::Copy {
                    reason: CopyReason::Added,
                    ..
                }
            )
        })
    }

    /// Files copied over an outdated destination file.
    pub fn modified(&self) -> usize {
        self.count(|op| {
            matches!(
                op,
                SyncOperation::Copy {
                    reason: CopyReason::Modified,
                    ..
                }
            )
        })
    }

    pub fn copies(&self) -> usize {
        self.count(SyncOperation::is_copy)
    }

    /// Files and directories removed.
    pub fn deletes(&self) -> usize {
        self.count(SyncOperation::is_delete)
    }

    /// Failed operations.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_failure())
            .count()
    }

    /// Failed operations plus walk issues.
    pub fn errors(&self) -> usize {
        self.failed() + self.issues.len()
    }

    pub fn elapsed(&self) -> Duration {
        (self.finished - self.started).to_std().unwrap_or_default()
    }
}

/// Runs synchronization passes for one configuration.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    config: SyncConfig,
}

impl SyncEngine {
    /// Create an engine after validating the configuration.
    pub fn new(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Plan a pass without changing anything.
    pub fn plan(&self) -> Result<SyncPlan> {
        self.config.validate()?;
        let ignore = IgnoreMatcher::load(&self.config.source)?;
        Ok(SyncPlanner::new(&self.config, &ignore).plan())
    }

    /// Run one pass and append its block to `log`.
    ///
    /// # Errors
    ///
    /// Only fatal conditions are returned: invalid roots, an unreadable
    /// ignore file, a destination that cannot be created or a failed log
    /// write. Per-file failures are part of the report.
    pub fn run_pass<W: Write>(
        &self,
        pass: u64,
        log: &mut ChangeLog<W>,
        stop: &StopToken,
    ) -> Result<PassReport> {
        let started = Local::now();
        info!(pass, mode = %self.config.mode, "Starting pass");

        self.config.validate()?;
        mirror_fs::io::ensure_dir(&self.config.destination)?;

        let ignore = IgnoreMatcher::load(&self.config.source)?;
        let plan = SyncPlanner::new(&self.config, &ignore).plan();
        let Execution {
            outcomes,
            interrupted,
        } = SyncExecutor::new(&self.config).apply(&plan, stop);

        let report = PassReport {
            pass,
            mode: self.config.mode,
            started,
            finished: Local::now(),
            planned: plan.operations.len(),
            outcomes,
            issues: plan.issues,
            interrupted,
        };

        for issue in &report.issues {
            warn!(tree = %issue.tree, path = %issue.path, error = %issue.detail, "Unreadable entry");
        }

        log.record(&report)?;

        info!(
            pass,
            added = report.added(),
            modified = report.modified(),
            deleted = report.deletes(),
            errors = report.errors(),
            "Pass finished"
        );
        Ok(report)
    }
}
