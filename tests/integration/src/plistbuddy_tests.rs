//! End-to-end tests against the real PlistBuddy
//!
//! These only run on macOS, where `/usr/libexec/PlistBuddy` exists. Each
//! test works on a fresh document in a temporary directory; PlistBuddy
//! creates the file on the first `Add`.

#![cfg(target_os = "macos")]

use std::path::{Path, PathBuf};

use plist_core::{
    DesiredEntry, Identity, KeyPath, PlistBuddy, ReconcileOutcome, Reconciler, ToolExecutor,
    ValueType,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;

fn document(temp: &TempDir) -> PathBuf {
    temp.path().join("com.example.test.plist")
}

fn entry(document: &Path, keys: &str, value: Value) -> DesiredEntry {
    DesiredEntry::new(document, KeyPath::parse(keys).unwrap(), value)
}

fn print(document: &Path, keys: &str) -> Option<String> {
    let command = format!("Print {}", KeyPath::parse(keys).unwrap().quoted());
    PlistBuddy::new()
        .execute(document, &command, &Identity::current())
        .ok()
        .map(|out| out.trim().to_string())
}

#[test]
fn test_scalar_round_trip() {
    let temp = TempDir::new().unwrap();
    let doc = document(&temp);
    let reconciler = Reconciler::new(PlistBuddy::new());
    let desired = entry(&doc, "Greeting", json!("hello world"));

    assert!(!reconciler.reconcile(&desired).unwrap().is_noop());
    assert_eq!(reconciler.reconcile(&desired).unwrap(), ReconcileOutcome::Matched);
    assert_eq!(print(&doc, "Greeting").as_deref(), Some("hello world"));
}

#[test]
fn test_array_grows_then_trims() {
    let temp = TempDir::new().unwrap();
    let doc = document(&temp);
    let reconciler = Reconciler::new(PlistBuddy::new());

    reconciler
        .reconcile(&entry(&doc, "Servers", json!(["a", "b", "c", "d"])))
        .unwrap();
    assert_eq!(print(&doc, "Servers:3").as_deref(), Some("d"));

    let shorter = entry(&doc, "Servers", json!(["a", "b"]));
    reconciler.reconcile(&shorter).unwrap();

    assert_eq!(print(&doc, "Servers:1").as_deref(), Some("b"));
    assert_eq!(print(&doc, "Servers:2"), None);
    assert_eq!(reconciler.reconcile(&shorter).unwrap(), ReconcileOutcome::Matched);
}

#[test]
fn test_date_with_offset_is_accepted() {
    let temp = TempDir::new().unwrap();
    let doc = document(&temp);
    let reconciler = Reconciler::new(PlistBuddy::new());
    let desired = entry(&doc, "Expires", json!("2030-06-01T09:00:00-07:00"));
    assert_eq!(desired.value_type, ValueType::Date);

    reconciler.reconcile(&desired).unwrap();

    assert!(print(&doc, "Expires").is_some());
    assert!(reconciler.matches(&desired));
}

#[test]
fn test_typed_values_settle_after_one_pass() {
    let temp = TempDir::new().unwrap();
    let doc = document(&temp);
    let reconciler = Reconciler::new(PlistBuddy::new());

    for desired in [
        entry(&doc, "Count", json!("42")),
        entry(&doc, "Enabled", json!(true)),
        entry(&doc, "Proxy", json!({"Host": "proxy.local", "Port": 8080})),
    ] {
        reconciler.reconcile(&desired).unwrap();
        assert_eq!(
            reconciler.reconcile(&desired).unwrap(),
            ReconcileOutcome::Matched,
            "{} did not settle",
            desired.key_path
        );
    }
}

#[test]
fn test_remove_deletes_key() {
    let temp = TempDir::new().unwrap();
    let doc = document(&temp);
    let reconciler = Reconciler::new(PlistBuddy::new());

    reconciler.reconcile(&entry(&doc, "Legacy", json!("x"))).unwrap();
    let absent = DesiredEntry::absent(&doc, KeyPath::parse("Legacy").unwrap());

    assert_eq!(
        reconciler.reconcile(&absent).unwrap(),
        ReconcileOutcome::Converged { commands: 1 }
    );
    assert_eq!(print(&doc, "Legacy"), None);
}
