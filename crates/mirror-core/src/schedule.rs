//! Interval loop around [`SyncEngine::run_pass`]

use std::io::Write;

use tracing::info;

use crate::{ChangeLog, PassReport, Result, StopToken, SyncEngine};

/// Totals over every pass of a schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    pub passes: u64,
    pub copies: usize,
    pub deletes: usize,
    /// Failed operations and walk issues across all passes
    pub errors: usize,
    /// True when the stop token ended the schedule
    pub stopped: bool,
}

/// Run passes until the interval is zero or `stop` is tripped.
///
/// With a zero interval exactly one pass runs. Otherwise the loop sleeps on
/// the stop token between passes. `on_pass` sees each report as soon as it
/// is logged.
///
/// # Errors
///
/// The first fatal pass error ends the schedule.
pub fn run_schedule<W: Write>(
    engine: &SyncEngine,
    log: &mut ChangeLog<W>,
    stop: &StopToken,
    mut on_pass: impl FnMut(&PassReport),
) -> Result<ScheduleSummary> {
    let interval = engine.config().interval;
    let mut summary = ScheduleSummary::default();

    loop {
        if stop.is_stopped() {
            summary.stopped = true;
            break;
        }

        summary.passes += 1;
        let report = engine.run_pass(summary.passes, log, stop)?;
        summary.copies += report.copies();
        summary.deletes += report.deletes();
        summary.errors += report.errors();
        on_pass(&report);

        if report.interrupted {
            summary.stopped = true;
            break;
        }
        if interval.is_zero() {
            break;
        }

        info!(seconds = interval.as_secs(), "Waiting for next pass");
        if stop.wait_timeout(interval) {
            summary.stopped = true;
            break;
        }
    }

    Ok(summary)
}
