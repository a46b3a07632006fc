//! In-memory PlistBuddy
//!
//! [`FakePlistBuddy`] keeps one document as a [`Node`] tree and answers the
//! four commands the reconciler issues with the same success/failure
//! behavior as the real tool: missing keys fail, containers cannot be `Set`,
//! and array elements can only be added up to the current end.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use plist_core::path::{KeyPath, PathSegment};
use plist_core::{Identity, ToolError, ToolExecutor};
use serde_json::Value;

/// A typed plist value
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    String(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    /// Dates are kept in the text form they were set with
    Date(String),
    Array(Vec<Node>),
    Dict(BTreeMap<String, Node>),
}

impl Node {
    /// Build a tree from JSON, mapping numbers to integer or real
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Node::String(String::new()),
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Integer(i),
                None => Node::Real(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Node::String(s.clone()),
            Value::Array(items) => Node::Array(items.iter().map(Node::from_json).collect()),
            Value::Object(map) => Node::Dict(
                map.iter()
                    .map(|(k, v)| (k.clone(), Node::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// What `Print` shows for this node
    fn printed(&self) -> String {
        match self {
            Node::String(s) | Node::Date(s) => s.clone(),
            Node::Integer(i) => i.to_string(),
            Node::Real(r) => format!("{:.6}", r),
            Node::Bool(b) => b.to_string(),
            Node::Array(items) => {
                let body: Vec<String> = items.iter().map(|n| format!("    {}", n.printed())).collect();
                format!("Array {{\n{}\n}}", body.join("\n"))
            }
            Node::Dict(map) => {
                let body: Vec<String> = map
                    .iter()
                    .map(|(k, n)| format!("    {} = {}", k, n.printed()))
                    .collect();
                format!("Dict {{\n{}\n}}", body.join("\n"))
            }
        }
    }
}

/// Executor backed by an in-memory document
#[derive(Debug)]
pub struct FakePlistBuddy {
    root: Mutex<Node>,
    log: Mutex<Vec<String>>,
    failing: Mutex<Vec<String>>,
}

impl Default for FakePlistBuddy {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlistBuddy {
    /// An empty document (root dictionary)
    pub fn new() -> Self {
        Self::with_root(Node::Dict(BTreeMap::new()))
    }

    /// A document whose root dictionary is built from a JSON object
    pub fn from_json(value: Value) -> Self {
        Self::with_root(Node::from_json(&value))
    }

    fn with_root(root: Node) -> Self {
        Self {
            root: Mutex::new(root),
            log: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
        }
    }

    /// Fail every command that starts with `prefix`
    pub fn fail_commands_starting_with(&self, prefix: &str) {
        self.failing.lock().unwrap().push(prefix.to_string());
    }

    /// Every command received, in order
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Every non-`Print` command received, in order
    pub fn mutations(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| !c.starts_with("Print "))
            .collect()
    }

    /// Forget the recorded commands
    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    /// The node at `path` (colon form), if any
    pub fn get(&self, path: &str) -> Option<Node> {
        let key_path = KeyPath::parse(path).ok()?;
        let root = self.root.lock().unwrap();
        lookup(&root, key_path.segments()).cloned()
    }

    /// Insert or replace a node, creating nothing on the way
    pub fn insert(&self, path: &str, node: Node) {
        let key_path = KeyPath::parse(path).expect("valid key path");
        let (last, parent_path) = key_path
            .segments()
            .split_last()
            .expect("non-empty key path");
        let mut root = self.root.lock().unwrap();
        let parent = lookup_mut(&mut root, parent_path).expect("parent exists");
        match (parent, last) {
            (Node::Dict(map), segment) => {
                map.insert(segment_key(segment), node);
            }
            (Node::Array(items), PathSegment::Index(i)) if *i < items.len() => items[*i] = node,
            (Node::Array(items), PathSegment::Index(i)) if *i == items.len() => items.push(node),
            _ => panic!("cannot insert at {}", path),
        }
    }

    fn run(&self, command: &str) -> Result<String, ToolError> {
        let words = shell_words::split(command).map_err(|e| failure(format!("Parse Error: {}", e)))?;
        let (verb, args) = words.split_first().ok_or_else(|| failure("Empty command"))?;
        let path_text = args.first().ok_or_else(|| failure("Missing path"))?;
        let key_path = KeyPath::parse(path_text).map_err(|e| failure(e.to_string()))?;
        let segments = key_path.segments();
        let not_found = || ToolError::KeyAbsent {
            output: format!("{}: Entry, \":{}\", Does Not Exist", verb, path_text),
        };

        let mut root = self.root.lock().unwrap();
        match verb.as_str() {
            "Print" => lookup(&root, segments)
                .map(|node| format!("{}\n", node.printed()))
                .ok_or_else(not_found),
            "Set" => {
                let value = args.get(1).ok_or_else(|| failure("Set: Missing value"))?;
                let node = lookup_mut(&mut root, segments).ok_or_else(not_found)?;
                *node = typed_node(node_type_name(node), Some(value))?;
                Ok(String::new())
            }
            "Add" => {
                let type_name = args.get(1).ok_or_else(|| failure("Add: Missing type"))?;
                let node = typed_node(type_name, args.get(2))?;
                let (last, parent_path) = segments.split_last().ok_or_else(not_found)?;
                let parent = lookup_mut(&mut root, parent_path).ok_or_else(not_found)?;
                match (parent, last) {
                    (Node::Dict(map), segment) => {
                        let key = segment_key(segment);
                        if map.contains_key(&key) {
                            return Err(failure(format!(
                                "Add: \":{}\" Entry Already Exists",
                                path_text
                            )));
                        }
                        map.insert(key, node);
                    }
                    (Node::Array(items), PathSegment::Index(i)) if *i <= items.len() => {
                        items.insert(*i, node)
                    }
                    _ => return Err(not_found()),
                }
                Ok(String::new())
            }
            "Delete" => {
                let (last, parent_path) = segments.split_last().ok_or_else(not_found)?;
                let parent = lookup_mut(&mut root, parent_path).ok_or_else(not_found)?;
                match (parent, last) {
                    (Node::Dict(map), segment) => {
                        map.remove(&segment_key(segment)).ok_or_else(not_found)?;
                    }
                    (Node::Array(items), PathSegment::Index(i)) if *i < items.len() => {
                        items.remove(*i);
                    }
                    _ => return Err(not_found()),
                }
                Ok(String::new())
            }
            other => Err(failure(format!("Unrecognized Command: {}", other))),
        }
    }
}

impl ToolExecutor for FakePlistBuddy {
    fn execute(
        &self,
        _document: &Path,
        command: &str,
        _identity: &Identity,
    ) -> Result<String, ToolError> {
        self.log.lock().unwrap().push(command.to_string());

        if self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| command.starts_with(prefix.as_str()))
        {
            return Err(failure("Simulated failure"));
        }

        self.run(command)
    }
}

fn failure(output: impl Into<String>) -> ToolError {
    ToolError::InvocationFailed {
        code: 1,
        output: output.into(),
    }
}

fn segment_key(segment: &PathSegment) -> String {
    match segment {
        PathSegment::Key(key) => key.clone(),
        PathSegment::Index(i) => i.to_string(),
    }
}

fn lookup<'a>(node: &'a Node, segments: &[PathSegment]) -> Option<&'a Node> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(node);
    };
    let next = match (node, first) {
        (Node::Dict(map), segment) => map.get(&segment_key(segment))?,
        (Node::Array(items), PathSegment::Index(i)) => items.get(*i)?,
        _ => return None,
    };
    lookup(next, rest)
}

fn lookup_mut<'a>(node: &'a mut Node, segments: &[PathSegment]) -> Option<&'a mut Node> {
    let Some((first, rest)) = segments.split_first() else {
        return Some(node);
    };
    let next = match (node, first) {
        (Node::Dict(map), segment) => map.get_mut(&segment_key(segment))?,
        (Node::Array(items), PathSegment::Index(i)) => items.get_mut(*i)?,
        _ => return None,
    };
    lookup_mut(next, rest)
}

fn node_type_name(node: &Node) -> &'static str {
    match node {
        Node::String(_) => "string",
        Node::Integer(_) => "integer",
        Node::Real(_) => "real",
        Node::Bool(_) => "bool",
        Node::Date(_) => "date",
        Node::Array(_) => "array",
        Node::Dict(_) => "dict",
    }
}

fn typed_node(type_name: &str, value: Option<&String>) -> Result<Node, ToolError> {
    let mismatch = |output: String| ToolError::TypeMismatch { output };
    let text = value.map(String::as_str);
    match type_name {
        "string" => Ok(Node::String(text.unwrap_or_default().to_string())),
        "integer" => match text {
            None => Ok(Node::Integer(0)),
            Some(t) => t
                .parse()
                .map(Node::Integer)
                .map_err(|_| mismatch(format!("Unrecognized Integer Format: {}", t))),
        },
        "real" => match text {
            None => Ok(Node::Real(0.0)),
            Some(t) => t
                .parse()
                .map(Node::Real)
                .map_err(|_| mismatch(format!("Unrecognized Real Format: {}", t))),
        },
        "bool" => match text {
            None => Ok(Node::Bool(false)),
            Some("true" | "YES" | "yes" | "1") => Ok(Node::Bool(true)),
            Some("false" | "NO" | "no" | "0") => Ok(Node::Bool(false)),
            Some(t) => Err(mismatch(format!("Unrecognized Boolean Format: {}", t))),
        },
        "date" => Ok(Node::Date(
            text.unwrap_or("Thu Jan 01 00:00:00 GMT 1970").to_string(),
        )),
        "array" | "dict" if text.is_some() => Err(mismatch(
            "Set: Cannot Perform Set On Containers".to_string(),
        )),
        "array" => Ok(Node::Array(Vec::new())),
        "dict" => Ok(Node::Dict(BTreeMap::new())),
        other => Err(mismatch(format!("Unrecognized Type: {}", other))),
    }
}
