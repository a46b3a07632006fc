//! Desired state for one key

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{ValueType, infer_type};
use crate::executor::Identity;
use crate::path::KeyPath;

/// Whether the key should exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

/// A fully resolved request to reconcile one key of one document
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredEntry {
    /// The property-list file
    pub document: PathBuf,
    /// Location of the key inside the document
    pub key_path: KeyPath,
    /// Desired value; ignored when `ensure` is `Absent`
    pub value: Value,
    /// Declared or inferred type of `value`
    pub value_type: ValueType,
    /// User/group the tool runs as
    pub identity: Identity,
    pub ensure: Ensure,
}

impl DesiredEntry {
    /// A present entry whose type is inferred from `value`
    pub fn new(document: impl Into<PathBuf>, key_path: KeyPath, value: Value) -> Self {
        let value_type = infer_type(&value);
        Self {
            document: document.into(),
            key_path,
            value,
            value_type,
            identity: Identity::current(),
            ensure: Ensure::Present,
        }
    }

    /// An entry asking for the key to be removed
    pub fn absent(document: impl Into<PathBuf>, key_path: KeyPath) -> Self {
        Self {
            ensure: Ensure::Absent,
            ..Self::new(document, key_path, Value::Null)
        }
    }

    /// Use the declared type, falling back to inference when `None`
    pub fn with_type(mut self, declared: Option<ValueType>) -> Self {
        self.value_type = declared.unwrap_or_else(|| infer_type(&self.value));
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = identity;
        self
    }
}
