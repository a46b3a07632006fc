//! Reconciliation of one desired key against a document
//!
//! The only view of the document is PlistBuddy's `Print` output, and the
//! only way to change it is `Add`, `Set` and `Delete` on a single key path.
//! [`Reconciler::matches`] decides whether anything needs to change and
//! [`Reconciler::apply`] issues the commands that make it match.
//!
//! Reads never fail: any error from `Print` counts as "absent". Writes stop
//! at the first failed command and report it; commands already issued are
//! not rolled back, and a later pass is expected to finish the job.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::codec::{self, Rendered, ValueType};
use crate::entry::{DesiredEntry, Ensure};
use crate::error::{Error, Result};
use crate::executor::{Identity, ToolExecutor};
use crate::hooks::MutationHook;
use crate::outcome::{ReconcileOutcome, Step};
use crate::path::KeyPath;

/// Reconciles desired entries through a [`ToolExecutor`]
pub struct Reconciler<E> {
    executor: E,
    hook: Option<Box<dyn MutationHook + Send + Sync>>,
}

impl<E: ToolExecutor> Reconciler<E> {
    /// Create a reconciler without a post-mutation hook
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            hook: None,
        }
    }

    /// Run `hook` once after every successful mutation
    pub fn with_hook(mut self, hook: impl MutationHook + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Whether `path` exists in `document`.
    ///
    /// Issues `Print <path>`. A missing key, an unreadable document and a
    /// failed invocation all read as `false`.
    pub fn key_present(&self, document: &Path, path: &KeyPath, identity: &Identity) -> bool {
        self.session(document, identity).key_present(path)
    }

    /// Whether the document already holds the desired entry.
    ///
    /// - strings, integers, booleans: printed text equals the value's text
    /// - reals and dates: presence alone (their printed form is not compared)
    /// - arrays: every element matches and there is no element at `len`
    /// - dicts: every desired entry matches; extra keys are not detected
    pub fn matches(&self, entry: &DesiredEntry) -> bool {
        let session = self.session(&entry.document, &entry.identity);
        match entry.ensure {
            Ensure::Absent => !session.key_present(&entry.key_path),
            Ensure::Present => match codec::render(&entry.value, entry.value_type) {
                Ok(rendered) => session.matches(&entry.key_path, &rendered),
                Err(err) => {
                    debug!(key = %entry.key_path, error = %err, "Desired value does not render");
                    false
                }
            },
        }
    }

    /// Issue the commands that make the document match `entry`.
    ///
    /// Returns the number of mutating commands issued. The hook, if any,
    /// runs once afterwards.
    pub fn apply(&self, entry: &DesiredEntry) -> Result<usize> {
        if entry.ensure == Ensure::Absent {
            return self.remove(entry);
        }

        // Reject malformed values before the first mutation
        let rendered = codec::render(&entry.value, entry.value_type)?;

        let mut session = self.session(&entry.document, &entry.identity);
        session.converge(&entry.key_path, &rendered)?;
        self.after_mutation(entry)?;

        info!(
            document = %entry.document.display(),
            key = %entry.key_path,
            commands = session.mutations,
            "Converged key"
        );
        Ok(session.mutations)
    }

    /// Delete the key if it exists.
    ///
    /// Returns the number of commands issued (0 or 1).
    pub fn remove(&self, entry: &DesiredEntry) -> Result<usize> {
        let mut session = self.session(&entry.document, &entry.identity);
        if !session.key_present(&entry.key_path) {
            return Ok(0);
        }

        session.mutate(
            Step::DeleteKey,
            format!("Delete {}", entry.key_path.quoted()),
        )?;
        self.after_mutation(entry)?;

        info!(
            document = %entry.document.display(),
            key = %entry.key_path,
            "Removed key"
        );
        Ok(session.mutations)
    }

    /// Check, then converge if needed.
    pub fn reconcile(&self, entry: &DesiredEntry) -> Result<ReconcileOutcome> {
        if self.matches(entry) {
            debug!(key = %entry.key_path, "Key already matches");
            return Ok(ReconcileOutcome::Matched);
        }

        let commands = self.apply(entry)?;
        Ok(ReconcileOutcome::Converged { commands })
    }

    fn after_mutation(&self, entry: &DesiredEntry) -> Result<()> {
        if let Some(hook) = &self.hook {
            hook.on_mutated(&entry.document, &entry.identity)
                .map_err(Error::Hook)?;
        }
        Ok(())
    }

    fn session<'a>(&'a self, document: &'a Path, identity: &'a Identity) -> Session<'a, E> {
        Session {
            executor: &self.executor,
            document,
            identity,
            mutations: 0,
        }
    }
}

/// Commands against one document under one identity
struct Session<'a, E> {
    executor: &'a E,
    document: &'a Path,
    identity: &'a Identity,
    mutations: usize,
}

impl<E: ToolExecutor> Session<'_, E> {
    fn print(&self, path: &KeyPath) -> Option<String> {
        let command = format!("Print {}", path.quoted());
        match self.executor.execute(self.document, &command, self.identity) {
            Ok(output) => Some(output.trim().to_string()),
            Err(err) => {
                debug!(%command, error = %err, "Print failed, treating key as absent");
                None
            }
        }
    }

    fn key_present(&self, path: &KeyPath) -> bool {
        self.print(path).is_some()
    }

    fn matches(&self, path: &KeyPath, rendered: &Rendered) -> bool {
        match rendered {
            Rendered::Scalar {
                value_type: ValueType::Real | ValueType::Date,
                ..
            } => self.key_present(path),
            Rendered::Scalar { text, .. } => self.print(path).as_deref() == Some(text.as_str()),
            Rendered::Array(items) => {
                // An empty array has no element to prove the key exists
                if items.is_empty() && !self.key_present(path) {
                    return false;
                }
                items
                    .iter()
                    .enumerate()
                    .all(|(index, item)| self.matches(&path.child(index), item))
                    && !self.key_present(&path.child(items.len()))
            }
            Rendered::Dict(entries) => {
                if entries.is_empty() && !self.key_present(path) {
                    return false;
                }
                entries
                    .iter()
                    .all(|(key, item)| self.matches(&path.key(key), item))
            }
        }
    }

    fn converge(&mut self, path: &KeyPath, rendered: &Rendered) -> Result<()> {
        match rendered {
            Rendered::Scalar {
                value_type, token, ..
            } => {
                if self.key_present(path) {
                    self.mutate(Step::SetValue, format!("Set {} {}", path.quoted(), token))
                } else {
                    self.mutate(
                        Step::CreateKey,
                        format!("Add {} {} {}", path.quoted(), value_type.tool_name(), token),
                    )
                }
            }
            Rendered::Array(items) => self.converge_array(path, items),
            Rendered::Dict(entries) => self.converge_dict(path, entries),
        }
    }

    fn converge_array(&mut self, path: &KeyPath, items: &[Rendered]) -> Result<()> {
        if !self.key_present(path) {
            self.mutate(Step::CreateKey, format!("Add {} array", path.quoted()))?;
        }

        // Ascending from 0: the tool cannot add an element past the current end.
        let mut extended = false;
        for (index, item) in items.iter().enumerate() {
            let element = path.child(index);
            let current = self.print(&element);

            if current.is_none() {
                self.mutate(
                    Step::ExtendArray { index },
                    format!("Add {} {}", element.quoted(), item.value_type().tool_name()),
                )?;
                extended = true;
            }

            match item {
                Rendered::Scalar { token, text, .. } => {
                    if current.as_deref() != Some(text.as_str()) {
                        self.mutate(
                            Step::SetElement { index },
                            format!("Set {} {}", element.quoted(), token),
                        )?;
                    }
                }
                container => self.converge(&element, container)?,
            }
        }

        // An array that had to grow has nothing past the desired length.
        if !extended {
            self.trim_array(path, items.len())?;
        }
        Ok(())
    }

    /// Delete every element at or beyond `desired_len`.
    ///
    /// There is no length query, so the on-disk length is found by probing
    /// `Print` forward one index at a time: O(n) in the on-disk length.
    fn trim_array(&mut self, path: &KeyPath, desired_len: usize) -> Result<()> {
        let mut on_disk = desired_len;
        while self.key_present(&path.child(on_disk)) {
            on_disk += 1;
        }

        // Highest index first; deleting a lower one shifts the rest down.
        for index in (desired_len..on_disk).rev() {
            self.mutate(
                Step::TrimArray { index },
                format!("Delete {}", path.child(index).quoted()),
            )?;
        }
        Ok(())
    }

    fn converge_dict(&mut self, path: &KeyPath, entries: &[(String, Rendered)]) -> Result<()> {
        if !self.key_present(path) {
            self.mutate(Step::CreateKey, format!("Add {} dict", path.quoted()))?;
        }

        for (key, item) in entries {
            let child = path.key(key);
            if !self.matches(&child, item) {
                self.converge(&child, item)?;
            }
        }
        Ok(())
    }

    fn mutate(&mut self, step: Step, command: String) -> Result<()> {
        debug!(document = %self.document.display(), %command, "Issuing tool command");
        match self.executor.execute(self.document, &command, self.identity) {
            Ok(_) => {
                self.mutations += 1;
                Ok(())
            }
            Err(source) => {
                warn!(
                    document = %self.document.display(),
                    %command,
                    %step,
                    error = %source,
                    "Tool command failed"
                );
                Err(Error::StepFailed {
                    step,
                    command,
                    source,
                })
            }
        }
    }
}
