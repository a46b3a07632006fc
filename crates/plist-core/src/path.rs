//! Key paths into a property-list document
//!
//! PlistBuddy addresses entries with colon-separated paths. Dictionary keys
//! are plain segments and array elements are numeric indices:
//!
//! - Nested keys: `Settings:Network:Proxy`
//! - Array elements: `Servers:0`
//! - Combined: `Servers:0:Host`
//!
//! A literal colon inside a key is written as `\:`.
//!
//! # Examples
//!
//! ```
//! use plist_core::path::{KeyPath, PathSegment};
//!
//! let path = KeyPath::parse("Servers:0:Host").unwrap();
//! assert_eq!(path.segments(), &[
//!     PathSegment::Key("Servers".to_string()),
//!     PathSegment::Index(0),
//!     PathSegment::Key("Host".to_string()),
//! ]);
//! assert_eq!(path.to_string(), "Servers:0:Host");
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// A segment of a key path - either a dictionary key or an array index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A key in a dictionary (e.g., "Network" in `Settings:Network`)
    Key(String),
    /// An index in an array (e.g., 0 in `Servers:0`)
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{}", key.replace(':', "\\:")),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

/// Non-empty sequence of segments locating one entry in a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<PathSegment>,
}

impl KeyPath {
    /// Build a key path from segments.
    ///
    /// Fails when there are no segments or a key segment is empty.
    pub fn new(segments: Vec<PathSegment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::key_path("", "a key path needs at least one segment"));
        }
        if segments
            .iter()
            .any(|s| matches!(s, PathSegment::Key(key) if key.is_empty()))
        {
            let path = Self { segments };
            return Err(Error::key_path(path.to_string(), "empty key segment"));
        }
        Ok(Self { segments })
    }

    /// Parse the colon-separated text form.
    ///
    /// Segments made only of ASCII digits become array indices; `\:` keeps a
    /// literal colon inside a key.
    ///
    /// ```
    /// use plist_core::path::{KeyPath, PathSegment};
    ///
    /// let path = KeyPath::parse(r"Proxies:http\:80").unwrap();
    /// assert_eq!(path.segments()[1], PathSegment::Key("http:80".to_string()));
    /// ```
    pub fn parse(path: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = path.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '\\' if chars.peek() == Some(&':') => {
                    current.push(':');
                    chars.next();
                }
                ':' => {
                    segments.push(segment_from_text(std::mem::take(&mut current)));
                }
                _ => current.push(ch),
            }
        }
        segments.push(segment_from_text(current));

        Self::new(segments).map_err(|_| Error::key_path(path, "empty segment"))
    }

    /// The segments of this path
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Path of the array element at `index` below this path
    pub fn child(&self, index: usize) -> Self {
        self.join(PathSegment::Index(index))
    }

    /// Path of the dictionary entry `key` below this path
    pub fn key(&self, key: &str) -> Self {
        self.join(PathSegment::Key(key.to_string()))
    }

    fn join(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// The path as a single quoted command token
    pub fn quoted(&self) -> String {
        crate::codec::quote_token(&self.to_string())
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

fn segment_from_text(text: String) -> PathSegment {
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = text.parse::<usize>() {
            return PathSegment::Index(index);
        }
    }
    PathSegment::Key(text)
}
