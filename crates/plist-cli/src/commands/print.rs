//! Print command implementation

use std::path::Path;

use plist_core::{Identity, KeyPath, PlistBuddy, ToolExecutor};

use crate::cli::TargetArgs;
use crate::error::Result;

/// Run the print command
pub fn run_print(target: &TargetArgs, tool: &Path) -> Result<()> {
    let key_path = KeyPath::parse(&target.key)?;
    let identity = Identity::new(target.user.clone(), target.group.clone());

    let output = PlistBuddy::with_binary(tool).execute(
        &target.file,
        &format!("Print {}", key_path.quoted()),
        &identity,
    )?;
    print!("{}", output);
    Ok(())
}
