//! Parameter and attribute values.
//!
//! Cell parameters and attributes are string-keyed maps of [`ConstValue`]s.
//! Maps are ordered so that snapshots compare deterministically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A constant parameter or attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A string.
    String(String),
}

impl ConstValue {
    /// Returns the integer value, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConstValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` for `Bool(true)` and nonzero `Int`s.
    pub fn is_truthy(&self) -> bool {
        match self {
            ConstValue::Bool(b) => *b,
            ConstValue::Int(v) => *v != 0,
            ConstValue::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<i64> for ConstValue {
    fn from(v: i64) -> Self {
        ConstValue::Int(v)
    }
}

impl From<&str> for ConstValue {
    fn from(s: &str) -> Self {
        ConstValue::String(s.to_string())
    }
}

impl From<String> for ConstValue {
    fn from(s: String) -> Self {
        ConstValue::String(s)
    }
}

impl From<bool> for ConstValue {
    fn from(b: bool) -> Self {
        ConstValue::Bool(b)
    }
}

/// An ordered attribute map.
pub type Attributes = BTreeMap<String, ConstValue>;
