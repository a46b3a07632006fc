//! Reconciliation results
//!
//! Failures are not an outcome variant: they surface as
//! [`Error::StepFailed`](crate::Error::StepFailed), which names the
//! [`Step`] and the command that failed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of a successful reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum ReconcileOutcome {
    /// The document already matched; no command was issued
    Matched,
    /// The document was mutated to match
    Converged {
        /// Number of mutating commands issued
        commands: usize,
    },
}

impl ReconcileOutcome {
    /// Whether nothing had to change
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Matched)
    }

    /// Number of mutating commands issued
    pub fn commands(&self) -> usize {
        match self {
            Self::Matched => 0,
            Self::Converged { commands } => *commands,
        }
    }
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::Converged { commands } => write!(f, "converged ({} commands)", commands),
        }
    }
}

/// The sub-step of a converge that issued a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// `Add` of a missing key (scalar or container)
    CreateKey,
    /// `Set` of an existing scalar key
    SetValue,
    /// `Add` of a missing array element
    ExtendArray { index: usize },
    /// `Set` of an array element
    SetElement { index: usize },
    /// `Delete` of a trailing array element
    TrimArray { index: usize },
    /// `Delete` of the whole key
    DeleteKey,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateKey => write!(f, "create key"),
            Self::SetValue => write!(f, "set value"),
            Self::ExtendArray { index } => write!(f, "extend array at {}", index),
            Self::SetElement { index } => write!(f, "set element {}", index),
            Self::TrimArray { index } => write!(f, "trim element {}", index),
            Self::DeleteKey => write!(f, "delete key"),
        }
    }
}
