//! Plan execution
//!
//! Applies operations one at a time. A failing operation becomes a
//! [`Outcome::Failed`] entry and the pass moves on.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use mirror_fs::RobustnessConfig;
use tracing::{debug, info, warn};

use crate::{StopToken, SyncConfig, SyncOperation, SyncPlan};

/// Result of applying one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Nothing to do, e.g. the delete target was already gone
    AlreadySatisfied,
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// An executed operation and when it finished.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    pub operation: SyncOperation,
    pub outcome: Outcome,
    pub at: DateTime<Local>,
}

/// Outcomes of a plan in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Execution {
    pub outcomes: Vec<OperationOutcome>,
    /// Set when the stop token ended execution early
    pub interrupted: bool,
}

/// Applies planned operations against the two roots.
#[derive(Debug, Clone)]
pub struct SyncExecutor {
    source: PathBuf,
    destination: PathBuf,
    robustness: RobustnessConfig,
}

impl SyncExecutor {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            source: config.source.clone(),
            destination: config.destination.clone(),
            robustness: config.robustness,
        }
    }

    /// Apply every operation in order, checking `stop` before each one.
    pub fn apply(&self, plan: &SyncPlan, stop: &StopToken) -> Execution {
        let mut execution = Execution::default();

        for operation in &plan.operations {
            if stop.is_stopped() {
                info!(
                    remaining = plan.operations.len() - execution.outcomes.len(),
                    "Stop requested, skipping remaining operations"
                );
                execution.interrupted = true;
                break;
            }

            let outcome = self.apply_one(operation);
            match &outcome {
                Outcome::Failed(detail) => warn!(operation = %operation, error = %detail, "Operation failed"),
                _ => debug!(operation = %operation, ?outcome, "Applied"),
            }

            execution.outcomes.push(OperationOutcome {
                operation: operation.clone(),
                outcome,
                at: Local::now(),
            });
        }

        execution
    }

    fn apply_one(&self, operation: &SyncOperation) -> Outcome {
        let result = match operation {
            SyncOperation::Copy { path, .. } => mirror_fs::io::copy_file(
                &path.resolve(&self.source),
                &path.resolve(&self.destination),
                self.robustness,
            )
            .map(|_| true),
            SyncOperation::Delete {
                path,
                in_destination,
            } => {
                let root = if *in_destination {
                    &self.destination
                } else {
                    &self.source
                };
                mirror_fs::io::remove_file(&path.resolve(root), self.robustness)
            }
            SyncOperation::RemoveDir { path } => {
                mirror_fs::io::remove_empty_dir(&path.resolve(&self.destination), self.robustness)
            }
            SyncOperation::Purge {
                raw,
                directory: true,
                ..
            } => mirror_fs::io::remove_empty_dir(&self.destination.join(raw), self.robustness),
            SyncOperation::Purge { raw, .. } => {
                mirror_fs::io::remove_file(&self.destination.join(raw), self.robustness)
            }
        };

        match result {
            Ok(true) => Outcome::Success,
            Ok(false) => Outcome::AlreadySatisfied,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}
