//! Tool execution under an acting identity
//!
//! The reconciler only needs to run one PlistBuddy command against one
//! document and learn whether it succeeded. [`ToolExecutor`] is that seam;
//! [`PlistBuddy`] is the process-backed implementation.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Default location of the PlistBuddy binary on macOS
pub const DEFAULT_TOOL_PATH: &str = "/usr/libexec/PlistBuddy";

/// User and group to run tool commands as
///
/// Either may be a name or a numeric id. `None` keeps the current process
/// identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl Identity {
    /// Identity of the current process
    pub fn current() -> Self {
        Self::default()
    }

    /// Run as the given user and group
    pub fn new(user: Option<String>, group: Option<String>) -> Self {
        Self { user, group }
    }

    /// Whether this identity leaves the process credentials unchanged
    pub fn is_current(&self) -> bool {
        self.user.is_none() && self.group.is_none()
    }
}

/// Runs a single tool command against a document
pub trait ToolExecutor {
    /// Execute `command` (e.g. `Print Servers:0`) against `document`.
    ///
    /// Returns stdout on success. Any error means the key is absent or the
    /// mutation did not happen; the tool offers no finer signal.
    fn execute(
        &self,
        document: &Path,
        command: &str,
        identity: &Identity,
    ) -> Result<String, ToolError>;
}

impl<T: ToolExecutor + ?Sized> ToolExecutor for &T {
    fn execute(
        &self,
        document: &Path,
        command: &str,
        identity: &Identity,
    ) -> Result<String, ToolError> {
        (**self).execute(document, command, identity)
    }
}

/// Executes commands with `PlistBuddy -c <command> <document>`
#[derive(Debug, Clone)]
pub struct PlistBuddy {
    binary: PathBuf,
}

impl Default for PlistBuddy {
    fn default() -> Self {
        Self::new()
    }
}

impl PlistBuddy {
    /// Use the binary at [`DEFAULT_TOOL_PATH`]
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_TOOL_PATH)
    }

    /// Use a specific PlistBuddy binary
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl ToolExecutor for PlistBuddy {
    fn execute(
        &self,
        document: &Path,
        command: &str,
        identity: &Identity,
    ) -> Result<String, ToolError> {
        let args = [OsStr::new("-c"), OsStr::new(command), document.as_os_str()];
        run_as(&self.binary, &args, identity)
    }
}

/// Run `program` with `args` under `identity`, returning stdout.
///
/// Non-zero exits are classified from the combined output.
pub fn run_as(program: &Path, args: &[&OsStr], identity: &Identity) -> Result<String, ToolError> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    apply_identity(&mut cmd, identity)?;

    let output = cmd.output().map_err(|e| match e.kind() {
        ErrorKind::NotFound => ToolError::ToolNotFound {
            path: program.to_path_buf(),
        },
        ErrorKind::PermissionDenied => ToolError::PermissionDenied {
            reason: format!("cannot run {}: {}", program.display(), e),
        },
        _ => ToolError::Io(e),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr).trim().to_string();
    Err(classify_failure(output.status.code().unwrap_or(-1), combined))
}

/// Map a failed invocation to a [`ToolError`] from the text PlistBuddy prints
pub fn classify_failure(code: i32, output: String) -> ToolError {
    if output.contains("Does Not Exist") {
        ToolError::KeyAbsent { output }
    } else if output.contains("Unrecognized Type")
        || output.contains("Cannot Perform Set On Containers")
        || output.to_lowercase().contains("type mismatch")
    {
        ToolError::TypeMismatch { output }
    } else {
        ToolError::InvocationFailed { code, output }
    }
}

#[cfg(unix)]
fn apply_identity(cmd: &mut Command, identity: &Identity) -> Result<(), ToolError> {
    use std::os::unix::process::CommandExt;

    if let Some(group) = &identity.group {
        cmd.gid(resolve_gid(group)?);
    }
    if let Some(user) = &identity.user {
        cmd.uid(resolve_uid(user)?);
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_identity(_cmd: &mut Command, identity: &Identity) -> Result<(), ToolError> {
    if identity.is_current() {
        Ok(())
    } else {
        Err(ToolError::PermissionDenied {
            reason: "running as another user is only supported on Unix".to_string(),
        })
    }
}

#[cfg(unix)]
fn resolve_uid(user: &str) -> Result<u32, ToolError> {
    if let Ok(uid) = user.parse::<u32>() {
        return Ok(uid);
    }
    match nix::unistd::User::from_name(user) {
        Ok(Some(passwd)) => Ok(passwd.uid.as_raw()),
        Ok(None) => Err(ToolError::PermissionDenied {
            reason: format!("unknown user '{}'", user),
        }),
        Err(e) => Err(ToolError::PermissionDenied {
            reason: format!("cannot resolve user '{}': {}", user, e),
        }),
    }
}

#[cfg(unix)]
fn resolve_gid(group: &str) -> Result<u32, ToolError> {
    if let Ok(gid) = group.parse::<u32>() {
        return Ok(gid);
    }
    match nix::unistd::Group::from_name(group) {
        Ok(Some(entry)) => Ok(entry.gid.as_raw()),
        Ok(None) => Err(ToolError::PermissionDenied {
            reason: format!("unknown group '{}'", group),
        }),
        Err(e) => Err(ToolError::PermissionDenied {
            reason: format!("cannot resolve group '{}': {}", group, e),
        }),
    }
}
