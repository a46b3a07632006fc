//! Manifest parsing for plist-sync TOML files
//!
//! A manifest lists the keys to reconcile, with optional defaults for the
//! acting identity:
//!
//! ```toml
//! [defaults]
//! user = "alice"
//! reload_cache = true
//!
//! [[entry]]
//! file = "/Library/Preferences/com.example.plist"
//! keys = ["Servers", 0]
//! value = "alpha"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::ValueType;
use crate::entry::{DesiredEntry, Ensure};
use crate::error::{Error, Result};
use crate::executor::Identity;
use crate::path::{KeyPath, PathSegment};

fn default_reload_cache() -> bool {
    true
}

/// Settings shared by every entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    /// User to run the tool as
    #[serde(default)]
    pub user: Option<String>,
    /// Group to run the tool as
    #[serde(default)]
    pub group: Option<String>,
    /// Refresh the preferences cache after mutations
    #[serde(default = "default_reload_cache")]
    pub reload_cache: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            user: None,
            group: None,
            reload_cache: default_reload_cache(),
        }
    }
}

/// One key path segment as written in TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySegmentSpec {
    Index(u64),
    Key(String),
}

/// Key path as written in TOML: `"A:B:0"` or `["A", "B", 0]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeysSpec {
    Text(String),
    List(Vec<KeySegmentSpec>),
}

impl KeysSpec {
    fn to_key_path(&self) -> Result<KeyPath> {
        match self {
            Self::Text(text) => KeyPath::parse(text),
            Self::List(items) => {
                let segments = items
                    .iter()
                    .map(|item| match item {
                        KeySegmentSpec::Index(index) => usize::try_from(*index)
                            .map(PathSegment::Index)
                            .map_err(|_| Error::key_path(index.to_string(), "index out of range")),
                        KeySegmentSpec::Key(key) => Ok(PathSegment::Key(key.clone())),
                    })
                    .collect::<Result<Vec<_>>>()?;
                KeyPath::new(segments)
            }
        }
    }
}

/// A single `[[entry]]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySpec {
    /// Property-list file to edit
    pub file: PathBuf,
    /// Key path inside the file
    pub keys: KeysSpec,
    /// Desired value; required unless `ensure = "absent"`
    #[serde(default)]
    pub value: Option<toml::Value>,
    /// Declared type; inferred from `value` when omitted
    #[serde(default, rename = "type")]
    pub value_type: Option<ValueType>,
    #[serde(default)]
    pub ensure: Ensure,
    /// Overrides `defaults.user`
    #[serde(default)]
    pub user: Option<String>,
    /// Overrides `defaults.group`
    #[serde(default)]
    pub group: Option<String>,
}

/// Parsed plist-sync manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default, rename = "entry")]
    pub entries: Vec<EntrySpec>,
}

impl Manifest {
    /// Parse a manifest from TOML content
    ///
    /// ```
    /// use plist_core::Manifest;
    ///
    /// let manifest = Manifest::parse(r#"
    /// [[entry]]
    /// file = "/tmp/com.example.plist"
    /// keys = "Servers:0"
    /// value = "alpha"
    /// "#).unwrap();
    ///
    /// assert_eq!(manifest.entries.len(), 1);
    /// assert!(manifest.defaults.reload_cache);
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ManifestParse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a manifest from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::ManifestParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Resolve every entry into a request, applying the defaults
    pub fn desired_entries(&self) -> Result<Vec<DesiredEntry>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, spec)| self.resolve(index, spec))
            .collect()
    }

    fn resolve(&self, index: usize, spec: &EntrySpec) -> Result<DesiredEntry> {
        let key_path = spec.keys.to_key_path().map_err(|e| Error::InvalidEntry {
            index,
            reason: e.to_string(),
        })?;

        let identity = Identity::new(
            spec.user.clone().or_else(|| self.defaults.user.clone()),
            spec.group.clone().or_else(|| self.defaults.group.clone()),
        );

        let entry = match (spec.ensure, &spec.value) {
            (Ensure::Absent, _) => DesiredEntry::absent(&spec.file, key_path),
            (Ensure::Present, Some(value)) => {
                DesiredEntry::new(&spec.file, key_path, to_json(value)).with_type(spec.value_type)
            }
            (Ensure::Present, None) => {
                return Err(Error::InvalidEntry {
                    index,
                    reason: "`value` is required unless ensure = \"absent\"".to_string(),
                });
            }
        };

        Ok(entry.with_identity(identity))
    }
}

/// Convert a TOML value for the codec. Native datetimes become their
/// RFC 3339 text so they infer as dates.
fn to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(key, item)| (key.clone(), to_json(item)))
                .collect(),
        ),
    }
}
