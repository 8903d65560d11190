//! Bit-level signal specifications.
//!
//! A [`SigSpec`] is an ordered vector of [`SigBit`]s, least significant bit
//! first. Each bit is either one bit of a module signal or a four-state
//! constant. Cell ports connect to `SigSpec`s, and two ports are wired
//! together exactly when their specs compare equal bit for bit.

use crate::ids::SignalId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A four-state logic constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// Logic zero.
    S0,
    /// Logic one.
    S1,
    /// Unknown.
    Sx,
    /// High impedance.
    Sz,
}

impl State {
    fn symbol(self) -> char {
        match self {
            State::S0 => '0',
            State::S1 => '1',
            State::Sx => 'x',
            State::Sz => 'z',
        }
    }
}

/// A single bit: one bit of a signal or a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigBit {
    /// Bit `offset` of `signal`.
    Wire {
        /// The signal this bit belongs to.
        signal: SignalId,
        /// Bit position within the signal.
        offset: u32,
    },
    /// A constant bit.
    Const(State),
}

/// An ordered list of bits, LSB first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigSpec(Vec<SigBit>);

impl SigSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a spec covering bits `0..width` of `signal`.
    pub fn wire(signal: SignalId, width: u32) -> Self {
        Self((0..width).map(|offset| SigBit::Wire { signal, offset }).collect())
    }

    /// Creates a spec of `width` copies of the constant `state`.
    pub fn constant(state: State, width: u32) -> Self {
        Self(vec![SigBit::Const(state); width as usize])
    }

    /// Creates a spec from an explicit bit list.
    pub fn from_bits(bits: Vec<SigBit>) -> Self {
        Self(bits)
    }

    /// Number of bits.
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the spec has no bits.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The bits, LSB first.
    pub fn bits(&self) -> &[SigBit] {
        &self.0
    }

    /// Returns `true` if every bit is a constant.
    pub fn is_fully_const(&self) -> bool {
        self.0.iter().all(|b| matches!(b, SigBit::Const(_)))
    }

    /// Returns bits `offset..offset + width` as a new spec.
    ///
    /// Out-of-range bits are dropped.
    pub fn extract(&self, offset: usize, width: usize) -> SigSpec {
        SigSpec(self.0.iter().skip(offset).take(width).copied().collect())
    }

    /// Appends the bits of `other` above the bits of `self`.
    pub fn append(&mut self, other: &SigSpec) {
        self.0.extend_from_slice(&other.0);
    }
}

impl From<SigBit> for SigSpec {
    fn from(bit: SigBit) -> Self {
        SigSpec(vec![bit])
    }
}

impl fmt::Display for SigSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, bit) in self.0.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match bit {
                SigBit::Wire { signal, offset } => write!(f, "{}[{}]", signal.as_raw(), offset)?,
                SigBit::Const(s) => write!(f, "{}", s.symbol())?,
            }
        }
        f.write_str("}")
    }
}
