//! Property-list key reconciliation through PlistBuddy
//!
//! This crate converges a single key of a property-list document to a
//! desired value using only PlistBuddy's `Print`, `Add`, `Set` and `Delete`
//! commands. It provides:
//!
//! - **Key paths**: colon-separated paths with array indices
//! - **Codec**: type inference and single-token rendering, including the
//!   UTC date format PlistBuddy accepts
//! - **Reconciler**: the match check and the minimal command sequence,
//!   including array trimming
//! - **Executors and hooks**: running the tool under a user/group and
//!   refreshing the preferences cache afterwards
//! - **Manifest**: TOML description of the keys to reconcile
//!
//! # Example
//!
//! ```no_run
//! use plist_core::{DesiredEntry, KeyPath, PlistBuddy, Reconciler};
//! use serde_json::json;
//!
//! fn example() -> plist_core::Result<()> {
//!     let reconciler = Reconciler::new(PlistBuddy::new());
//!     let entry = DesiredEntry::new(
//!         "/Library/Preferences/com.example.plist",
//!         KeyPath::parse("Servers")?,
//!         json!(["alpha", "beta"]),
//!     );
//!     let outcome = reconciler.reconcile(&entry)?;
//!     println!("{}", outcome);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod engine;
pub mod entry;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod manifest;
pub mod outcome;
pub mod path;

pub use codec::{Rendered, ValueType, infer_type, render};
pub use engine::Reconciler;
pub use entry::{DesiredEntry, Ensure};
pub use error::{Error, Result, ToolError};
pub use executor::{DEFAULT_TOOL_PATH, Identity, PlistBuddy, ToolExecutor};
pub use hooks::{CacheReload, MutationHook};
pub use manifest::Manifest;
pub use outcome::{ReconcileOutcome, Step};
pub use path::{KeyPath, PathSegment};
