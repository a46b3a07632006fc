//! Apply command implementation

use std::path::Path;

use colored::Colorize;
use plist_core::ReconcileOutcome;

use crate::cli::EntryArgs;
use crate::error::{CliError, Result};

use super::{load_plan, reconciler};

/// Run the apply command
///
/// Every entry is attempted even if an earlier one fails; the command fails
/// afterwards if any entry did.
pub fn run_apply(
    manifest: Option<&Path>,
    args: &EntryArgs,
    tool: &Path,
    no_reload: bool,
    dry_run: bool,
) -> Result<()> {
    let plan = load_plan(manifest, args)?;
    let reconciler = reconciler(tool, plan.reload_cache && !no_reload);

    let mut failed = 0;
    for entry in &plan.entries {
        let label = format!("{} {}", entry.document.display(), entry.key_path);

        if dry_run {
            if reconciler.matches(entry) {
                println!("  {} {}", "=".dimmed(), label);
            } else {
                println!("  {} {} {}", "~".yellow(), label, "(would change)".dimmed());
            }
            continue;
        }

        match reconciler.reconcile(entry) {
            Ok(ReconcileOutcome::Matched) => {
                println!("  {} {}", "=".dimmed(), label);
            }
            Ok(outcome) => {
                println!("  {} {} ({})", "+".green(), label, outcome);
            }
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "x".red(), label, e);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::user(format!(
            "{} of {} entries failed",
            failed,
            plan.entries.len()
        )));
    }
    Ok(())
}
