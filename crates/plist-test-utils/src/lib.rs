//! Shared test utilities for the plist-sync workspace.
//!
//! This crate provides an in-memory stand-in for PlistBuddy so the
//! reconciler can be exercised without macOS. It is a dev-dependency only,
//! never published.
//!
//! # Modules
//!
//! - [`fake`]: [`FakePlistBuddy`], an executor that interprets `Print`,
//!   `Add`, `Set` and `Delete` against an in-memory tree and records every
//!   command it receives

pub mod fake;

pub use fake::{FakePlistBuddy, Node};
