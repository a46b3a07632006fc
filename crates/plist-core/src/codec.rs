//! Value typing and token rendering for PlistBuddy commands
//!
//! PlistBuddy takes every value as one word of its `-c` command line, so
//! each value is reduced to a quoted token. Containers are never rendered as
//! a literal; they are rendered element by element and the engine creates
//! them one key at a time.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

static INTEGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());
static REAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d*\.\d+$").unwrap());
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").unwrap());

/// The only timezone token emitted in dates. PlistBuddy accepts a few
/// abbreviations (`GMT`, `EST`) and rejects others (`PST`), so every date
/// is converted to UTC first.
const DATE_FORMAT: &str = "%a %b %d %H:%M:%S GMT %Y";

const OFFSET_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M %z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%dT%H:%M%:z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Value types understood by PlistBuddy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Real,
    #[serde(alias = "bool")]
    Boolean,
    Date,
    Array,
    Dict,
}

impl ValueType {
    /// Type name used in `Add` commands
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Boolean => "bool",
            Self::Date => "date",
            Self::Array => "array",
            Self::Dict => "dict",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "real" => Ok(Self::Real),
            "bool" | "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "array" => Ok(Self::Array),
            "dict" => Ok(Self::Dict),
            _ => Err(Error::InvalidValueType {
                name: s.to_string(),
            }),
        }
    }
}

/// Infer the type of a value that carries no declared type.
///
/// First match wins. String patterns are checked integer, real, then date,
/// so `"2020"` is an integer and `"2020-01-01"` a date.
///
/// ```
/// use plist_core::codec::{infer_type, ValueType};
/// use serde_json::json;
///
/// assert_eq!(infer_type(&json!("42")), ValueType::Integer);
/// assert_eq!(infer_type(&json!("3.14")), ValueType::Real);
/// assert_eq!(infer_type(&json!("2020-01-01")), ValueType::Date);
/// assert_eq!(infer_type(&json!(["x", "y"])), ValueType::Array);
/// assert_eq!(infer_type(&json!("hello")), ValueType::String);
/// ```
pub fn infer_type(value: &Value) -> ValueType {
    match value {
        Value::Array(_) => ValueType::Array,
        Value::Object(_) => ValueType::Dict,
        Value::Number(n) if n.is_i64() || n.is_u64() => ValueType::Integer,
        Value::Number(_) => ValueType::Real,
        Value::String(s) if INTEGER_PATTERN.is_match(s) => ValueType::Integer,
        Value::String(s) if REAL_PATTERN.is_match(s) => ValueType::Real,
        Value::Bool(_) => ValueType::Boolean,
        Value::String(s) if DATE_PATTERN.is_match(s) => ValueType::Date,
        _ => ValueType::String,
    }
}

/// Plain textual form of a scalar, as `Print` would show it
pub fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Quote a string as a single command-line word
pub fn quote_token(text: &str) -> String {
    shell_words::quote(text).into_owned()
}

/// Parse a caller-supplied date and normalize it to UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS[.fff]]` (space or `T`) with an
/// optional numeric offset or trailing `Z`, and a bare `YYYY-MM-DD`
/// (midnight). Inputs without an offset are taken as UTC.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    // A trailing `Z` is UTC, the same as no offset at all
    let naive_input = trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix('z'))
        .unwrap_or(trimmed);
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(naive_input, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(naive_input, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }

    Err(Error::InvalidDate {
        input: input.to_string(),
    })
}

/// Format a UTC instant the way PlistBuddy accepts dates
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// A value reduced to what the tool commands need
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// A single stored value
    Scalar {
        value_type: ValueType,
        /// Quoted token for `Add`/`Set`
        token: String,
        /// Unquoted text compared against `Print` output
        text: String,
    },
    /// Array elements in index order
    Array(Vec<Rendered>),
    /// Dictionary entries in key order
    Dict(Vec<(String, Rendered)>),
}

impl Rendered {
    /// The plist type this rendering is stored as
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Scalar { value_type, .. } => *value_type,
            Self::Array(_) => ValueType::Array,
            Self::Dict(_) => ValueType::Dict,
        }
    }
}

/// Render a value as the declared type.
///
/// Children of arrays and dictionaries are rendered with their own inferred
/// type, independently of their siblings. A scalar declared as `array`
/// becomes a one-element array.
pub fn render(value: &Value, value_type: ValueType) -> Result<Rendered> {
    match (value_type, value) {
        (ValueType::Array, Value::Array(items)) => items
            .iter()
            .map(|item| render(item, infer_type(item)))
            .collect::<Result<Vec<_>>>()
            .map(Rendered::Array),
        (ValueType::Array, Value::Object(_)) => Err(shape_error(value_type, value)),
        (ValueType::Array, scalar) => Ok(Rendered::Array(vec![render(scalar, infer_type(scalar))?])),
        (ValueType::Dict, Value::Object(map)) => map
            .iter()
            .map(|(key, item)| Ok((key.clone(), render(item, infer_type(item))?)))
            .collect::<Result<Vec<_>>>()
            .map(Rendered::Dict),
        (ValueType::Dict, _) => Err(shape_error(value_type, value)),
        (_, Value::Array(_) | Value::Object(_)) => Err(shape_error(value_type, value)),
        (ValueType::Date, scalar) => {
            let text = format_date(&parse_date(&text_form(scalar))?);
            Ok(Rendered::Scalar {
                value_type,
                token: quote_token(&text),
                text,
            })
        }
        (_, scalar) => {
            let text = text_form(scalar);
            Ok(Rendered::Scalar {
                value_type,
                token: quote_token(&text),
                text,
            })
        }
    }
}

fn shape_error(expected: ValueType, value: &Value) -> Error {
    let found = match value {
        Value::Array(_) => "an array",
        Value::Object(_) => "a dictionary",
        _ => "a scalar",
    };
    Error::ValueShape {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}
