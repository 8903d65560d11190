//! Typed generation requests and their text encoding.
//!
//! The generator receives its transform list as one string of the form
//! `_name@a1,a2_name@b1`: each transform is introduced by `_`, its name is
//! separated from its comma-separated integer arguments by `@`.
//! [`TransformSequence`]'s `Display` and `FromStr` are the only encoder and
//! decoder of that format.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default operand width.
pub const DEFAULT_WIDTH: u32 = 32;
/// Default starting topology.
pub const DEFAULT_START: &str = "ripple-carry";
/// Default mapping strategy.
pub const DEFAULT_MAPPING: &str = "behavioral";

/// Errors building or decoding a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Width was zero.
    #[error("width must be a positive integer")]
    ZeroWidth,

    /// A transform name is empty or contains a reserved character.
    #[error("invalid transform name `{0}`")]
    BadName(String),

    /// A transform is missing the `@` that separates name from arguments.
    #[error("transform `{0}` has no `@` separator")]
    MissingSeparator(String),

    /// A transform argument is not an integer.
    #[error("transform `{name}` has non-integer argument `{arg}`")]
    BadArgument {
        /// The transform name.
        name: String,
        /// The offending argument text.
        arg: String,
    },
}

/// One structural transform applied to the tree under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    /// Method name on the generator's tree object.
    pub name: String,
    /// Integer arguments, in call order.
    pub args: Vec<i64>,
}

impl Transform {
    /// Creates a transform, checking that `name` can be encoded.
    pub fn new(name: impl Into<String>, args: Vec<i64>) -> Result<Self, RequestError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { name, args })
    }
}

fn validate_name(name: &str) -> Result<(), RequestError> {
    let reserved = |c: char| matches!(c, '_' | '@' | ',' | '\'' | '"' | '\\') || c.is_whitespace();
    if name.is_empty() || name.chars().any(reserved) {
        return Err(RequestError::BadName(name.to_string()));
    }
    Ok(())
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}@", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{arg}")?;
        }
        Ok(())
    }
}

/// An ordered list of transforms, applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSequence(pub Vec<Transform>);

impl TransformSequence {
    /// Returns `true` if there are no transforms.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The transforms in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Transform> {
        self.0.iter()
    }
}

impl fmt::Display for TransformSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|t| write!(f, "{t}"))
    }
}

impl FromStr for TransformSequence {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim();
        let body = body.strip_prefix('_').unwrap_or(body);
        if body.is_empty() {
            return Ok(Self::default());
        }
        body.split('_')
            .map(|item| -> Result<Transform, RequestError> {
                let (name, args) = item
                    .split_once('@')
                    .ok_or_else(|| RequestError::MissingSeparator(item.to_string()))?;
                validate_name(name)?;
                let args = if args.is_empty() {
                    Vec::new()
                } else {
                    args.split(',')
                        .map(|a| {
                            a.parse::<i64>().map_err(|_| RequestError::BadArgument {
                                name: name.to_string(),
                                arg: a.to_string(),
                            })
                        })
                        .collect::<Result<Vec<i64>, _>>()?
                };
                Ok(Transform {
                    name: name.to_string(),
                    args,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(TransformSequence)
    }
}

/// Parameters for one adder-tree construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    width: u32,
    /// Starting topology, such as `ripple-carry` or `kogge-stone`.
    pub start_topology: String,
    /// Transforms applied to the starting tree.
    pub transforms: TransformSequence,
    /// Target mapping strategy, such as `behavioral`.
    pub mapping: String,
}

impl GenerationRequest {
    /// Creates a request. `width` must be positive.
    pub fn new(
        width: u32,
        start_topology: impl Into<String>,
        transforms: TransformSequence,
        mapping: impl Into<String>,
    ) -> Result<Self, RequestError> {
        if width == 0 {
            return Err(RequestError::ZeroWidth);
        }
        Ok(Self {
            width,
            start_topology: start_topology.into(),
            transforms,
            mapping: mapping.into(),
        })
    }

    /// A request for the mapping library only; width and topology are unused.
    pub fn maps(mapping: impl Into<String>) -> Self {
        Self {
            width: 1,
            start_topology: DEFAULT_START.to_string(),
            transforms: TransformSequence::default(),
            mapping: mapping.into(),
        }
    }

    /// Operand width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            start_topology: DEFAULT_START.to_string(),
            transforms: TransformSequence::default(),
            mapping: DEFAULT_MAPPING.to_string(),
        }
    }
}

/// Renders `s` as a single-quoted Python string literal.
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
