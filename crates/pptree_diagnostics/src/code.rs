//! Diagnostic codes such as `E201` and `W303`.
//!
//! Codes serialize as their display string so JSON reports can be grepped
//! for the same token the terminal shows.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Code family; decides the prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Category {
    /// `E`: a rewrite step failed.
    Error,
    /// `W`: the pass continued with a partial result.
    Warning,
    /// `N`: informational.
    Note,
}

impl Category {
    /// The prefix letter.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Note => 'N',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'E' => Some(Category::Error),
            'W' => Some(Category::Warning),
            'N' => Some(Category::Note),
            _ => None,
        }
    }
}

/// A prefix letter plus a three-digit number.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DiagnosticCode {
    /// Code family.
    pub category: Category,
    /// Number within the family.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

impl FromStr for DiagnosticCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let category = chars
            .next()
            .and_then(Category::from_prefix)
            .ok_or_else(|| format!("unknown diagnostic code prefix in `{s}`"))?;
        let number = chars
            .as_str()
            .parse()
            .map_err(|_| format!("malformed diagnostic code `{s}`"))?;
        Ok(Self::new(category, number))
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DiagnosticCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
