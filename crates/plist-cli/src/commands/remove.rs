//! Remove command implementation

use std::path::Path;

use colored::Colorize;
use plist_core::{DesiredEntry, Identity, KeyPath, ReconcileOutcome};

use crate::cli::TargetArgs;
use crate::error::Result;

use super::reconciler;

/// Run the remove command
pub fn run_remove(target: &TargetArgs, tool: &Path, no_reload: bool) -> Result<()> {
    let entry = DesiredEntry::absent(&target.file, KeyPath::parse(&target.key)?)
        .with_identity(Identity::new(target.user.clone(), target.group.clone()));

    match reconciler(tool, !no_reload).reconcile(&entry)? {
        ReconcileOutcome::Matched => {
            println!("{} {} is not present", "=".dimmed(), entry.key_path);
        }
        ReconcileOutcome::Converged { .. } => {
            println!("{} Removed {}", "-".red(), entry.key_path);
        }
    }
    Ok(())
}
