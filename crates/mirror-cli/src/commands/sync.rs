//! The sync command: resolve settings, confirm, then run the schedule

use std::io::IsTerminal;
use std::time::Duration;

use colored::Colorize;
use dialoguer::Confirm;
use tracing::warn;

use mirror_core::{
    ChangeLog, PassReport, StopToken, SyncConfig, SyncEngine, SyncMode, SyncPlan, SyncProfile,
    run_schedule,
};

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Merge the optional profile with command-line flags; flags win.
pub fn resolve_config(cli: &Cli) -> Result<SyncConfig> {
    let profile = match &cli.config {
        Some(path) => SyncProfile::load(path)?,
        None => SyncProfile::default(),
    };

    let source = cli.source.clone().or(profile.source).ok_or_else(|| {
        CliError::user("Missing source directory (first argument or `source` in the profile)")
    })?;
    let destination = cli.sync.clone().or(profile.destination).ok_or_else(|| {
        CliError::user("Missing sync directory (second argument or `sync` in the profile)")
    })?;

    let mut config = SyncConfig::new(source, destination)
        .with_mode(cli.mode.or(profile.mode).unwrap_or_default())
        .with_interval(Duration::from_secs(
            cli.interval.or(profile.interval).unwrap_or(0),
        ))
        .with_delete_ignored(cli.delete || profile.delete.unwrap_or(false))
        .with_time_factor(cli.time_factor.or(profile.time_factor).unwrap_or(1.0));

    if let Some(log) = cli.log.clone().or(profile.log) {
        config = config.with_log_path(log);
    }
    if let Some(robustness) = profile.robustness {
        config = config.with_robustness(robustness);
    }

    Ok(config)
}

/// Run the sync command.
pub fn run_sync(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let engine = SyncEngine::new(config)?;

    if cli.dry_run {
        let plan = engine.plan()?;
        print_plan(&plan);
        return Ok(());
    }

    if !cli.yes && std::io::stdin().is_terminal() && !confirm(engine.config())? {
        println!("Aborted.");
        return Ok(());
    }

    let stop = StopToken::new();
    spawn_interrupt_handler(stop.clone())?;

    let log_path = engine.config().log_path();
    let mut log = ChangeLog::open(&log_path)?;

    println!(
        "{} Syncing {} -> {} ({} mode)",
        "=>".blue().bold(),
        engine.config().source.display(),
        engine.config().destination.display(),
        engine.config().mode
    );

    let summary = run_schedule(&engine, &mut log, &stop, print_pass)?;

    if summary.stopped {
        println!("{} Stopped after {} pass(es).", "=>".blue().bold(), summary.passes);
    }
    if summary.errors > 0 {
        println!(
            "{} {} operation(s) failed; see {}",
            "WARN".yellow().bold(),
            summary.errors,
            log_path.display()
        );
    }

    Ok(())
}

fn confirm(config: &SyncConfig) -> Result<bool> {
    let prompt = match config.mode {
        SyncMode::Reset => format!(
            "Reset mode deletes everything in {} that is not in {}. Continue?",
            config.destination.display(),
            config.source.display()
        ),
        _ if config.delete_ignored => format!(
            "Ignored files will be deleted from {}. Continue?",
            config.destination.display()
        ),
        _ => format!(
            "Mirror {} into {}?",
            config.source.display(),
            config.destination.display()
        ),
    };

    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(config.mode != SyncMode::Reset)
        .interact()?)
}

/// Trip `stop` on Ctrl-C. A second Ctrl-C exits immediately.
fn spawn_interrupt_handler(stop: StopToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                warn!("Interrupt received, stopping after the current operation");
                stop.stop();

                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        })?;

    Ok(())
}

fn print_pass(report: &PassReport) {
    let status = if report.errors() > 0 {
        "WARN".yellow().bold()
    } else {
        "OK".green().bold()
    };
    println!(
        "{} pass #{}: {} added, {} modified, {} deleted, {} error(s)",
        status,
        report.pass,
        report.added(),
        report.modified(),
        report.deletes(),
        report.errors()
    );
}

fn print_plan(plan: &SyncPlan) {
    println!("{} Dry run, nothing will be changed", "=>".blue().bold());
    for operation in &plan.operations {
        println!("   {operation}");
    }
    for issue in &plan.issues {
        println!(
            "   {} {} {}: {}",
            "ERROR".red(),
            issue.tree,
            issue.path,
            issue.detail
        );
    }
    println!(
        "{} {} copy(ies), {} delete(s) planned",
        "=>".blue().bold(),
        plan.copies(),
        plan.deletes()
    );
}
