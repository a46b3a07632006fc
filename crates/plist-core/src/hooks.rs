//! Post-mutation hooks
//!
//! macOS caches preference files in `cfprefsd`, so editing a plist on disk
//! may not be visible to readers until the cache is refreshed. A hook runs
//! once after a document has been mutated, under the same identity as the
//! mutating commands.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::error::ToolError;
use crate::executor::{Identity, run_as};

/// Called after a successful mutation of a document
pub trait MutationHook {
    fn on_mutated(&self, document: &Path, identity: &Identity) -> Result<(), ToolError>;
}

impl<F> MutationHook for F
where
    F: Fn(&Path, &Identity) -> Result<(), ToolError>,
{
    fn on_mutated(&self, document: &Path, identity: &Identity) -> Result<(), ToolError> {
        self(document, identity)
    }
}

/// Refreshes the preferences cache with `defaults read <document>`
#[derive(Debug, Clone)]
pub struct CacheReload {
    program: PathBuf,
}

impl Default for CacheReload {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheReload {
    /// Use `defaults` from `PATH`
    pub fn new() -> Self {
        Self::with_program("defaults")
    }

    /// Use a specific `defaults` binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MutationHook for CacheReload {
    fn on_mutated(&self, document: &Path, identity: &Identity) -> Result<(), ToolError> {
        tracing::debug!(document = %document.display(), "Reloading preferences cache");
        let args = [OsStr::new("read"), document.as_os_str()];
        run_as(&self.program, &args, identity).map(|_| ())
    }
}
