//! Check command implementation

use std::path::Path;

use colored::Colorize;

use crate::cli::EntryArgs;
use crate::error::{CliError, Result};

use super::{load_plan, reconciler};

/// Run the check command
///
/// Returns an error when any entry does not match, so the process exits
/// non-zero on drift.
pub fn run_check(manifest: Option<&Path>, args: &EntryArgs, tool: &Path) -> Result<()> {
    let plan = load_plan(manifest, args)?;
    let reconciler = reconciler(tool, false);

    let drifted = plan
        .entries
        .iter()
        .filter(|entry| {
            let matches = reconciler.matches(entry);
            let label = format!("{} {}", entry.document.display(), entry.key_path);
            if matches {
                println!("  {} {}", "ok".green(), label);
            } else {
                println!("  {} {}", "drift".yellow(), label);
            }
            !matches
        })
        .count();

    if drifted > 0 {
        return Err(CliError::user(format!(
            "{} of {} entries drifted",
            drifted,
            plan.entries.len()
        )));
    }

    println!("{}", "All entries match".green().bold());
    Ok(())
}
