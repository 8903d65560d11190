//! Named signals (wires) within a module.

use crate::ids::SignalId;
use serde::{Deserialize, Serialize};

/// A named multi-bit wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// The unique ID of this signal within its module.
    pub id: SignalId,
    /// The signal name.
    pub name: String,
    /// Width in bits.
    pub width: u32,
}
