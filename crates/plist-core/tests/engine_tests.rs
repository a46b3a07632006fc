//! Tests for the Reconciler against an in-memory PlistBuddy

use std::path::Path;
use std::sync::{Arc, Mutex};

use plist_core::{
    DesiredEntry, Error, Identity, KeyPath, ReconcileOutcome, Reconciler, Step, ToolError,
    ValueType,
};
use plist_test_utils::{FakePlistBuddy, Node};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

const DOCUMENT: &str = "/Library/Preferences/com.example.plist";

fn entry(keys: &str, value: Value) -> DesiredEntry {
    DesiredEntry::new(DOCUMENT, KeyPath::parse(keys).unwrap(), value)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Scalars
// ============================================================================

#[test]
fn test_reconcile_twice_is_idempotent() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);
    let desired = entry("Name", json!("alpha"));

    let first = reconciler.reconcile(&desired).unwrap();
    assert_eq!(first, ReconcileOutcome::Converged { commands: 1 });
    assert_eq!(fake.mutations(), strings(&["Add Name string alpha"]));

    fake.clear_log();
    let second = reconciler.reconcile(&desired).unwrap();
    assert_eq!(second, ReconcileOutcome::Matched);
    assert!(fake.mutations().is_empty());
}

#[test]
fn test_existing_key_is_set() {
    let fake = FakePlistBuddy::from_json(json!({"Name": "old"}));
    let reconciler = Reconciler::new(&fake);

    reconciler.reconcile(&entry("Name", json!("new"))).unwrap();

    assert_eq!(fake.mutations(), strings(&["Set Name new"]));
    assert_eq!(fake.get("Name"), Some(Node::String("new".into())));
}

#[test]
fn test_tokens_are_quoted() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);

    reconciler
        .reconcile(&entry("My Key", json!("hello world")))
        .unwrap();

    assert_eq!(
        fake.mutations(),
        strings(&["Add 'My Key' string 'hello world'"])
    );
    assert!(reconciler.matches(&entry("My Key", json!("hello world"))));
}

#[test]
fn test_boolean_round_trip() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);
    let desired = entry("Enabled", json!(true));

    reconciler.reconcile(&desired).unwrap();

    assert_eq!(fake.mutations(), strings(&["Add Enabled bool true"]));
    assert!(reconciler.matches(&desired));
}

#[test]
fn test_real_matches_on_presence_alone() {
    let fake = FakePlistBuddy::from_json(json!({"Ratio": 1.0}));
    let reconciler = Reconciler::new(&fake);

    assert!(reconciler.matches(&entry("Ratio", json!("2.5"))));
    assert!(!reconciler.matches(&entry("Missing", json!("2.5"))));
}

// ============================================================================
// Dates
// ============================================================================

#[test]
fn test_date_is_normalized_to_utc() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);
    let desired = entry("Expires", json!("2020-01-01T10:00:00-08:00"));
    assert_eq!(desired.value_type, ValueType::Date);

    reconciler.reconcile(&desired).unwrap();

    assert_eq!(
        fake.mutations(),
        strings(&["Add Expires date 'Wed Jan 01 18:00:00 GMT 2020'"])
    );
    assert_eq!(
        fake.get("Expires"),
        Some(Node::Date("Wed Jan 01 18:00:00 GMT 2020".into()))
    );
}

#[test]
fn test_date_matches_regardless_of_printed_text() {
    let fake = FakePlistBuddy::new();
    fake.insert("Expires", Node::Date("Sun Mar 01 09:00:00 PST 1998".into()));
    let reconciler = Reconciler::new(&fake);

    assert!(reconciler.matches(&entry("Expires", json!("2020-01-01"))));
}

#[test]
fn test_invalid_date_fails_before_mutating() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);
    let desired = entry("Expires", json!("not a date")).with_type(Some(ValueType::Date));

    assert!(!reconciler.matches(&desired));
    let err = reconciler.apply(&desired).unwrap_err();

    assert!(matches!(err, Error::InvalidDate { .. }));
    assert!(fake.mutations().is_empty());
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_absent_array_is_built_element_by_element() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);

    let commands = reconciler
        .apply(&entry("Servers", json!(["a", "b", "c"])))
        .unwrap();

    assert_eq!(
        fake.mutations(),
        strings(&[
            "Add Servers array",
            "Add Servers:0 string",
            "Set Servers:0 a",
            "Add Servers:1 string",
            "Set Servers:1 b",
            "Add Servers:2 string",
            "Set Servers:2 c",
        ])
    );
    assert_eq!(commands, 7);
    // Extension happened, so there is no trim probing
    assert!(!fake.commands().contains(&"Print Servers:3".to_string()));
}

#[test]
fn test_longer_array_is_trimmed_in_descending_order() {
    let fake = FakePlistBuddy::from_json(json!({"List": ["a", "b", "c", "d", "e"]}));
    let reconciler = Reconciler::new(&fake);

    reconciler.apply(&entry("List", json!(["a", "b"]))).unwrap();

    assert_eq!(
        fake.mutations(),
        strings(&["Delete List:4", "Delete List:3", "Delete List:2"])
    );
    assert_eq!(fake.get("List:1"), Some(Node::String("b".into())));
    assert_eq!(fake.get("List:2"), None);
}

#[test]
fn test_array_prefix_does_not_match() {
    let fake = FakePlistBuddy::from_json(json!({"List": ["a", "b", "c"]}));
    let reconciler = Reconciler::new(&fake);

    assert!(!reconciler.matches(&entry("List", json!(["a", "b"]))));
    assert!(reconciler.matches(&entry("List", json!(["a", "b", "c"]))));
}

#[test]
fn test_real_and_date_elements_match_on_presence() {
    let fake = FakePlistBuddy::from_json(json!({"Ratios": [1.5], "Names": ["a"]}));
    fake.insert("Stamps", Node::Array(vec![Node::Date("Sun Mar 01 09:00:00 PST 1998".into())]));
    let reconciler = Reconciler::new(&fake);

    let ratios = entry("Ratios", json!(["2.5"]));
    assert!(reconciler.matches(&ratios));
    assert_eq!(reconciler.reconcile(&ratios).unwrap(), ReconcileOutcome::Matched);
    assert!(reconciler.matches(&entry("Stamps", json!(["2030-01-01"]))));

    // Text elements are still compared
    assert!(!reconciler.matches(&entry("Names", json!(["b"]))));
    assert!(fake.mutations().is_empty());
}

#[rstest]
#[case::absent(None)]
#[case::shorter(Some(json!(["x"])))]
#[case::same_length_different(Some(json!(["p", "q"])))]
#[case::longer(Some(json!(["q", "r", "s", "t"])))]
#[case::empty(Some(json!([])))]
fn test_array_converges_from_any_length(#[case] initial: Option<Value>) {
    let fake = match initial {
        Some(list) => FakePlistBuddy::from_json(json!({ "L": list })),
        None => FakePlistBuddy::new(),
    };
    let reconciler = Reconciler::new(&fake);
    let desired = entry("L", json!(["x", "y"]));

    let outcome = reconciler.reconcile(&desired).unwrap();
    assert!(!outcome.is_noop());

    assert_eq!(fake.get("L:0"), Some(Node::String("x".into())));
    assert_eq!(fake.get("L:1"), Some(Node::String("y".into())));
    assert_eq!(fake.get("L:2"), None);
    assert_eq!(reconciler.reconcile(&desired).unwrap(), ReconcileOutcome::Matched);
}

#[test]
fn test_array_elements_infer_their_own_type() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);
    let desired = entry("Mixed", json!(["a", "2", "3.5"]));

    reconciler.reconcile(&desired).unwrap();

    let mutations = fake.mutations();
    assert!(mutations.contains(&"Add Mixed:0 string".to_string()));
    assert!(mutations.contains(&"Add Mixed:1 integer".to_string()));
    assert!(mutations.contains(&"Add Mixed:2 real".to_string()));
    assert_eq!(fake.get("Mixed:1"), Some(Node::Integer(2)));
    assert_eq!(fake.get("Mixed:2"), Some(Node::Real(3.5)));
    assert_eq!(reconciler.reconcile(&desired).unwrap(), ReconcileOutcome::Matched);
}

#[test]
fn test_empty_array_is_created() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);
    let desired = entry("Empty", json!([]));

    assert!(!reconciler.matches(&desired));
    reconciler.reconcile(&desired).unwrap();

    assert_eq!(fake.mutations(), strings(&["Add Empty array"]));
    assert!(reconciler.matches(&desired));
}

#[test]
fn test_nested_arrays() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);
    let desired = entry("Grid", json!([["a"], ["b", "c"]]));

    reconciler.reconcile(&desired).unwrap();

    assert_eq!(fake.get("Grid:1:1"), Some(Node::String("c".into())));
    assert_eq!(reconciler.reconcile(&desired).unwrap(), ReconcileOutcome::Matched);
}

// ============================================================================
// Dictionaries
// ============================================================================

#[test]
fn test_dict_is_built_key_by_key() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake);
    let desired = entry("Proxy", json!({"Host": "proxy.local", "Port": 8080}));

    reconciler.reconcile(&desired).unwrap();

    assert_eq!(
        fake.mutations(),
        strings(&[
            "Add Proxy dict",
            "Add Proxy:Host string proxy.local",
            "Add Proxy:Port integer 8080",
        ])
    );
    assert_eq!(reconciler.reconcile(&desired).unwrap(), ReconcileOutcome::Matched);
}

#[test]
fn test_dict_only_touches_drifted_keys() {
    let fake = FakePlistBuddy::from_json(json!({"Proxy": {"Host": "old", "Port": 8080}}));
    let reconciler = Reconciler::new(&fake);

    reconciler
        .reconcile(&entry("Proxy", json!({"Host": "new", "Port": 8080})))
        .unwrap();

    assert_eq!(fake.mutations(), strings(&["Set Proxy:Host new"]));
}

// ============================================================================
// Removal
// ============================================================================

#[test]
fn test_absent_entry_deletes_key() {
    let fake = FakePlistBuddy::from_json(json!({"Old": "x", "Keep": "y"}));
    let reconciler = Reconciler::new(&fake);
    let desired = DesiredEntry::absent(DOCUMENT, KeyPath::parse("Old").unwrap());

    let first = reconciler.reconcile(&desired).unwrap();
    assert_eq!(first, ReconcileOutcome::Converged { commands: 1 });
    assert_eq!(fake.mutations(), strings(&["Delete Old"]));
    assert_eq!(fake.get("Keep"), Some(Node::String("y".into())));

    fake.clear_log();
    assert_eq!(reconciler.reconcile(&desired).unwrap(), ReconcileOutcome::Matched);
    assert!(fake.mutations().is_empty());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_print_failures_read_as_absent() {
    let fake = FakePlistBuddy::from_json(json!({"A": "x"}));
    fake.fail_commands_starting_with("Print");
    let reconciler = Reconciler::new(&fake);

    assert!(!reconciler.key_present(
        Path::new(DOCUMENT),
        &KeyPath::parse("A").unwrap(),
        &Identity::current()
    ));
    assert!(!reconciler.matches(&entry("A", json!("x"))));
}

#[test]
fn test_failed_command_aborts_without_rollback() {
    let fake = FakePlistBuddy::from_json(json!({"L": []}));
    fake.fail_commands_starting_with("Set L:1");
    let reconciler = Reconciler::new(&fake);

    let err = reconciler
        .apply(&entry("L", json!(["a", "b", "c"])))
        .unwrap_err();

    assert_eq!(err.failed_step(), Some(Step::SetElement { index: 1 }));
    assert_eq!(
        fake.mutations(),
        strings(&[
            "Add L:0 string",
            "Set L:0 a",
            "Add L:1 string",
            "Set L:1 b",
        ])
    );
    // Earlier commands stay applied
    assert_eq!(fake.get("L:0"), Some(Node::String("a".into())));
}

#[test]
fn test_type_change_is_reported_not_repaired() {
    let fake = FakePlistBuddy::from_json(json!({"Name": ["a"]}));
    let reconciler = Reconciler::new(&fake);

    let err = reconciler
        .reconcile(&entry("Name", json!("x")))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::StepFailed {
            step: Step::SetValue,
            source: ToolError::TypeMismatch { .. },
            ..
        }
    ));
    assert!(matches!(fake.get("Name"), Some(Node::Array(_))));
}

// ============================================================================
// Hooks
// ============================================================================

fn recording_hook(
    calls: Arc<Mutex<Vec<Option<String>>>>,
) -> impl Fn(&Path, &Identity) -> Result<(), ToolError> + Send + Sync + 'static {
    move |_document: &Path, identity: &Identity| -> Result<(), ToolError> {
        calls.lock().unwrap().push(identity.user.clone());
        Ok(())
    }
}

#[test]
fn test_hook_runs_once_per_apply_with_identity() {
    let fake = FakePlistBuddy::new();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let reconciler = Reconciler::new(&fake).with_hook(recording_hook(calls.clone()));
    let desired = entry("Servers", json!(["a", "b", "c"]))
        .with_identity(Identity::new(Some("alice".into()), None));

    reconciler.reconcile(&desired).unwrap();
    reconciler.reconcile(&desired).unwrap();

    assert_eq!(*calls.lock().unwrap(), vec![Some("alice".to_string())]);
}

#[test]
fn test_hook_skipped_when_apply_fails() {
    let fake = FakePlistBuddy::new();
    fake.fail_commands_starting_with("Add");
    let calls = Arc::new(Mutex::new(Vec::new()));
    let reconciler = Reconciler::new(&fake).with_hook(recording_hook(calls.clone()));

    assert!(reconciler.reconcile(&entry("Name", json!("x"))).is_err());
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_hook_failure_is_reported() {
    let fake = FakePlistBuddy::new();
    let reconciler = Reconciler::new(&fake).with_hook(
        |_document: &Path, _identity: &Identity| -> Result<(), ToolError> {
            Err(ToolError::PermissionDenied {
                reason: "cannot reload".to_string(),
            })
        },
    );

    let err = reconciler.reconcile(&entry("Name", json!("x"))).unwrap_err();

    assert!(matches!(err, Error::Hook(ToolError::PermissionDenied { .. })));
    // The mutation itself went through
    assert_eq!(fake.get("Name"), Some(Node::String("x".into())));
}
