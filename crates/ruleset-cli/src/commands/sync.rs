//! Sync and check command implementations

use colored::Colorize;
use ruleset_core::{RulesetReport, RulesetStatus, SyncReport};
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::error::{CliError, Result};

/// Failure message of `check` when a pass would rewrite a ruleset.
pub const CHECK_FAILED: &str = "rulesets invalid: run sync to apply removals";

/// Run the sync command
///
/// Rewrites rulesets in place, or only reports with `dry_run`.
pub async fn run_sync(
    ctx: &Context,
    dry_run: bool,
    json: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    if !json {
        let action = if dry_run { "Previewing sync of" } else { "Syncing" };
        println!(
            "{} {} rulesets in {}...",
            "=>".blue().bold(),
            action,
            ctx.rulesets_root()
        );
    }

    let report = ctx.engine(dry_run)?.run(cancel).await?;
    emit(&report, json)?;
    finish(&report)
}

/// Run the check command
///
/// A dry run that fails when any ruleset would change.
pub async fn run_check(ctx: &Context, json: bool, cancel: &CancellationToken) -> Result<()> {
    if !json {
        println!(
            "{} Checking rulesets in {}...",
            "=>".blue().bold(),
            ctx.rulesets_root()
        );
    }

    let report = ctx.engine(true)?.run(cancel).await?;
    emit(&report, json)?;
    finish(&report)?;

    if report.has_changes() {
        return Err(CliError::user(CHECK_FAILED));
    }
    Ok(())
}

fn emit(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_report(report);
    }
    Ok(())
}

/// Map an incomplete or partially failed pass to an error.
fn finish(report: &SyncReport) -> Result<()> {
    if report.cancelled {
        return Err(CliError::Cancelled);
    }
    let failed = report.failures().count();
    if failed > 0 {
        return Err(CliError::user(format!(
            "{} ruleset(s) could not be processed",
            failed
        )));
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.scanned == 0 {
        println!("{} No ruleset files found. Nothing to do.", "NOTE".yellow().bold());
        return;
    }

    for ruleset in &report.rulesets {
        print_ruleset(ruleset, report.dry_run);
    }
    println!();

    let removed = report.total_removed();
    if report.cancelled {
        println!("{} Sync was cancelled before finishing.", "CANCELLED".red().bold());
    } else if !report.has_changes() {
        println!(
            "{} All references are available. No changes needed.",
            "OK".green().bold()
        );
    } else if report.dry_run {
        println!(
            "{} Would remove {} reference(s) from {} ruleset(s).",
            "DRY RUN".yellow().bold(),
            removed,
            report.modified
        );
    } else {
        println!(
            "{} Removed {} reference(s) from {} ruleset(s).",
            "OK".green().bold(),
            removed,
            report.modified
        );
    }

    let skipped = report.total_skipped();
    if skipped > 0 {
        println!(
            "{} {} reference(s) could not be checked and were kept.",
            "warning:".yellow().bold(),
            skipped
        );
    }
}

fn print_ruleset(ruleset: &RulesetReport, dry_run: bool) {
    let name = ruleset.name.cyan();
    match ruleset.status {
        RulesetStatus::Unchanged => {
            println!("   {} {} ({} checked)", "=".green(), name, ruleset.checked)
        }
        RulesetStatus::Updated => {
            println!("   {} {} ({} removed)", "~".yellow(), name, ruleset.removed.len())
        }
        RulesetStatus::WouldUpdate => println!(
            "   {} {} (would remove {})",
            "~".yellow(),
            name,
            ruleset.removed.len()
        ),
        RulesetStatus::Failed => println!(
            "   {} {}: {}",
            "!".red(),
            name,
            ruleset.error.as_deref().unwrap_or("unknown error")
        ),
        RulesetStatus::Cancelled => {
            println!("   {} {} (cancelled, left untouched)", "x".red(), name)
        }
    }

    for removal in &ruleset.removed {
        println!(
            "       {} {} (line {}): {}",
            "-".red(),
            removal.reference,
            removal.line,
            removal.reason
        );
    }
    for skip in &ruleset.skipped {
        println!(
            "       {} {} (line {}): kept, {}",
            "?".yellow(),
            skip.reference,
            skip.line,
            skip.reason.dimmed()
        );
    }

    if dry_run {
        if let Some(diff) = &ruleset.diff {
            print_diff(diff);
        }
    }
}

fn print_diff(diff: &str) {
    for line in diff.lines() {
        let styled = if line.starts_with("+++") || line.starts_with("---") {
            line.bold()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else if line.starts_with("@@") {
            line.cyan()
        } else {
            line.normal()
        };
        println!("       {}", styled);
    }
}
