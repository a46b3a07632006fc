//! Command implementations for plist-cli

pub mod apply;
pub mod check;
pub mod print;
pub mod remove;

use std::path::Path;

use plist_core::{
    CacheReload, DesiredEntry, Identity, KeyPath, Manifest, PlistBuddy, Reconciler,
};
use serde_json::Value;

use crate::cli::EntryArgs;
use crate::error::{CliError, Result};

pub use apply::run_apply;
pub use check::run_check;
pub use print::run_print;
pub use remove::run_remove;

/// Entries to work on, and whether the manifest asks for cache reloads
pub(crate) struct Plan {
    pub entries: Vec<DesiredEntry>,
    pub reload_cache: bool,
}

/// Resolve the entries from a manifest or from command-line flags
pub(crate) fn load_plan(manifest: Option<&Path>, args: &EntryArgs) -> Result<Plan> {
    if let Some(path) = manifest {
        let manifest = Manifest::load(path)?;
        let entries = manifest.desired_entries()?;
        return Ok(Plan {
            entries,
            reload_cache: manifest.defaults.reload_cache,
        });
    }

    let file = args
        .file
        .as_ref()
        .ok_or_else(|| CliError::user("either a manifest or --file is required"))?;
    let key = args
        .key
        .as_deref()
        .ok_or_else(|| CliError::user("--key is required with --file"))?;
    let value = args
        .value
        .as_deref()
        .ok_or_else(|| CliError::user("--value is required with --file"))?;

    let entry = DesiredEntry::new(file, KeyPath::parse(key)?, parse_value(value))
        .with_type(args.value_type)
        .with_identity(Identity::new(args.user.clone(), args.group.clone()));

    Ok(Plan {
        entries: vec![entry],
        reload_cache: true,
    })
}

/// Build the reconciler, wiring the cache reload hook when enabled
pub(crate) fn reconciler(tool: &Path, reload: bool) -> Reconciler<PlistBuddy> {
    let reconciler = Reconciler::new(PlistBuddy::with_binary(tool));
    if reload {
        reconciler.with_hook(CacheReload::new())
    } else {
        reconciler
    }
}

/// Interpret a command-line value: JSON when it parses, plain text otherwise
fn parse_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Array(_) | Value::Object(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value_json_containers() {
        assert_eq!(parse_value("[\"a\", \"b\"]"), json!(["a", "b"]));
        assert_eq!(parse_value("{\"k\": 1}"), json!({"k": 1}));
        assert_eq!(parse_value("true"), json!(true));
    }

    #[test]
    fn test_parse_value_keeps_scalars_as_text() {
        assert_eq!(parse_value("42"), json!("42"));
        assert_eq!(parse_value("3.10"), json!("3.10"));
        assert_eq!(parse_value("hello"), json!("hello"));
        assert_eq!(parse_value("\"quoted\""), json!("\"quoted\""));
    }

    #[test]
    fn test_load_plan_requires_file() {
        let err = load_plan(None, &EntryArgs::default()).err().unwrap();
        assert!(err.to_string().contains("--file"));
    }

    #[test]
    fn test_load_plan_from_flags() {
        let args = EntryArgs {
            file: Some("/tmp/a.plist".into()),
            key: Some("Servers:0".into()),
            value: Some("alpha".into()),
            user: Some("alice".into()),
            ..EntryArgs::default()
        };
        let plan = load_plan(None, &args).unwrap();
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].key_path.to_string(), "Servers:0");
        assert_eq!(plan.entries[0].identity.user.as_deref(), Some("alice"));
        assert!(plan.reload_cache);
    }
}
