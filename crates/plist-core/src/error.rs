//! Error types for plist-core

use std::path::PathBuf;

use crate::outcome::Step;

/// Result type for plist-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a [`ToolExecutor`](crate::executor::ToolExecutor)
///
/// PlistBuddy has no structured error channel, so these are classified from
/// the exit status and the text it prints.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The addressed key path does not exist
    #[error("Key does not exist: {output}")]
    KeyAbsent { output: String },

    /// The tool refused the value for the key's stored type
    #[error("Type mismatch: {output}")]
    TypeMismatch { output: String },

    /// Non-zero exit for any other reason
    #[error("Tool exited with code {code}: {output}")]
    InvocationFailed { code: i32, output: String },

    /// The tool binary could not be located
    #[error("Tool not found at {path}")]
    ToolNotFound { path: PathBuf },

    /// The acting identity could not be resolved or assumed
    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// Standard I/O error while spawning or reading the process
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur in plist-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A desired date string could not be parsed
    #[error("Invalid date '{input}': expected YYYY-MM-DD with an optional time and offset")]
    InvalidDate { input: String },

    /// A key path was empty or contained an empty segment
    #[error("Invalid key path '{path}': {reason}")]
    InvalidKeyPath { path: String, reason: String },

    /// Unknown value type name
    #[error("Invalid value type: {name}")]
    InvalidValueType { name: String },

    /// The value's shape cannot be stored as the declared type
    #[error("Cannot store {found} as {expected}")]
    ValueShape { expected: String, found: String },

    /// A mutating tool command failed; earlier commands are not rolled back
    #[error("{step} failed for `{command}`: {source}")]
    StepFailed {
        step: Step,
        command: String,
        source: ToolError,
    },

    /// The post-mutation hook failed after the document was converged
    #[error("Post-mutation hook failed: {0}")]
    Hook(#[source] ToolError),

    /// Manifest file could not be parsed
    #[error("Failed to parse manifest {path}: {message}")]
    ManifestParse { path: String, message: String },

    /// A manifest entry is incomplete or inconsistent
    #[error("Manifest entry {index} is invalid: {reason}")]
    InvalidEntry { index: usize, reason: String },

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The sub-step that failed, when this error came from a tool command
    pub fn failed_step(&self) -> Option<Step> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub(crate) fn key_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKeyPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
